//! `AdminApi` over HTTP against `/solr/admin/collections`.

use super::{AdminApi, AdminCommand, AsyncId, JobState, JobStatus};
use crate::{OrchestratorError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

/// Port assumed when the configured host carries none.
pub const DEFAULT_PORT: u16 = 8983;

/// Normalise a configured host to `host:port`.
pub fn host_string(raw: &str) -> String {
    if raw.contains(':') {
        raw.to_string()
    } else {
        format!("{}:{}", raw, DEFAULT_PORT)
    }
}

#[derive(Debug, Deserialize)]
struct RequestStatusResponse {
    status: RemoteStatus,
}

#[derive(Debug, Deserialize)]
struct RemoteStatus {
    state: String,
    #[serde(default)]
    msg: String,
}

/// Map a REQUESTSTATUS `state` onto [`JobState`]. `submitted` is not terminal
/// and is treated like `running`.
fn parse_state(state: &str) -> Result<JobState> {
    match state {
        "notfound" | "not_found" => Ok(JobState::NotFound),
        "submitted" | "running" => Ok(JobState::Running),
        "completed" => Ok(JobState::Completed),
        "failed" => Ok(JobState::Failed),
        other => Err(OrchestratorError::UnexpectedResponse(format!(
            "unknown async state '{}'",
            other
        ))),
    }
}

/// Collection names from a CLUSTERSTATUS body, in reported order.
fn collection_names(body: &Value) -> Result<Vec<String>> {
    body.pointer("/cluster/collections")
        .and_then(Value::as_object)
        .map(|collections| collections.keys().cloned().collect())
        .ok_or_else(|| {
            OrchestratorError::UnexpectedResponse(
                "CLUSTERSTATUS response has no cluster.collections".to_string(),
            )
        })
}

/// HTTP client for the collections admin endpoint of one cluster node.
#[derive(Debug, Clone)]
pub struct SolrAdminClient {
    client: reqwest::Client,
    base_url: String,
}

impl SolrAdminClient {
    /// `host` may omit the port; see [`host_string`].
    pub fn new(host: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("http://{}/solr/admin/collections", host_string(host)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call(&self, params: &[(&str, String)]) -> Result<reqwest::Response> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(params)
            .query(&[("wt", "json")])
            .send()
            .await?;
        Ok(resp)
    }
}

#[async_trait]
impl AdminApi for SolrAdminClient {
    async fn cluster_collections(&self) -> Result<Vec<String>> {
        let resp = self
            .call(&[("action", "CLUSTERSTATUS".to_string())])
            .await?;

        if !resp.status().is_success() {
            return Err(OrchestratorError::UnexpectedResponse(format!(
                "CLUSTERSTATUS returned HTTP {}",
                resp.status()
            )));
        }

        let body: Value = resp.json().await?;
        collection_names(&body)
    }

    async fn submit(&self, command: &AdminCommand, async_id: AsyncId) -> Result<()> {
        let mut params = command.params();
        params.push(("async", async_id.to_string()));

        let resp = self.call(&params).await?;
        let status = resp.status();
        info!(action = command.action(), async_id, status = status.as_u16(), "Submission answered");

        if status.is_success() {
            Ok(())
        } else {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(OrchestratorError::SubmissionFailed {
                action: command.action(),
                async_id,
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn request_status(&self, async_id: AsyncId) -> Result<JobStatus> {
        let resp = self
            .call(&[
                ("action", "REQUESTSTATUS".to_string()),
                ("requestid", async_id.to_string()),
            ])
            .await?;

        if !resp.status().is_success() {
            return Err(OrchestratorError::UnexpectedResponse(format!(
                "REQUESTSTATUS for async id {} returned HTTP {}",
                async_id,
                resp.status()
            )));
        }

        let body: RequestStatusResponse = resp.json().await?;
        let state = parse_state(&body.status.state)?;
        debug!(async_id, %state, msg = %body.status.msg, "REQUESTSTATUS");
        Ok(JobStatus::new(state, body.status.msg))
    }

    async fn delete_status(&self, async_id: AsyncId) -> Result<()> {
        let resp = self
            .call(&[
                ("action", "DELETESTATUS".to_string()),
                ("requestid", async_id.to_string()),
            ])
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(OrchestratorError::DeleteFailed {
                target: format!("async id {}", async_id),
                status: resp.status().as_u16(),
            })
        }
    }

    async fn flush_status(&self) -> Result<()> {
        let resp = self
            .call(&[
                ("action", "DELETESTATUS".to_string()),
                ("flush", "true".to_string()),
            ])
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(OrchestratorError::DeleteFailed {
                target: "all async ids".to_string(),
                status: resp.status().as_u16(),
            })
        }
    }
}
