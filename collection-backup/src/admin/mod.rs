//! Collections admin API.
//!
//! The orchestrator only talks to the index service through [`AdminApi`]:
//! list collections, submit an async BACKUP/RESTORE tagged with an async id,
//! poll REQUESTSTATUS for that id, and DELETESTATUS to free it again.

pub mod http;

#[cfg(test)]
pub mod fake;

use crate::Result;
use async_trait::async_trait;
use std::fmt;

pub use http::{host_string, SolrAdminClient};

/// Caller-chosen identifier of a remote async job, drawn from `[0, async_max)`.
pub type AsyncId = u32;

/// Remote state of an async id as reported by REQUESTSTATUS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// The id is unused (or its status was deleted).
    NotFound,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::NotFound => "not_found",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One REQUESTSTATUS answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub state: JobState,
    pub message: String,
}

impl JobStatus {
    pub fn new(state: JobState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }
}

/// A long-running collections command, submitted under an async id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    /// Snapshot `collection` into `location` under artifact `name`.
    Backup {
        collection: String,
        location: String,
        name: String,
    },
    /// Recreate artifact `name` from `location` as the new collection `collection`.
    Restore {
        collection: String,
        location: String,
        name: String,
    },
}

impl AdminCommand {
    pub fn action(&self) -> &'static str {
        match self {
            AdminCommand::Backup { .. } => "BACKUP",
            AdminCommand::Restore { .. } => "RESTORE",
        }
    }

    /// Target collection of the command.
    pub fn collection(&self) -> &str {
        match self {
            AdminCommand::Backup { collection, .. } | AdminCommand::Restore { collection, .. } => {
                collection
            }
        }
    }

    /// Artifact name in shared storage.
    pub fn artifact(&self) -> &str {
        match self {
            AdminCommand::Backup { name, .. } | AdminCommand::Restore { name, .. } => name,
        }
    }

    /// Query parameters for the command, without the async id.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            AdminCommand::Backup {
                collection,
                location,
                name,
            }
            | AdminCommand::Restore {
                collection,
                location,
                name,
            } => vec![
                ("action", self.action().to_string()),
                ("collection", collection.clone()),
                ("location", location.clone()),
                ("name", name.clone()),
            ],
        }
    }
}

/// Adapter for the collections admin API
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// Live collection names, in the order the service reports them.
    async fn cluster_collections(&self) -> Result<Vec<String>>;

    /// Submit `command` tagged with `async_id`. Returns once the service
    /// accepted or rejected it; completion is observed via `request_status`.
    async fn submit(&self, command: &AdminCommand, async_id: AsyncId) -> Result<()>;

    /// Current state of `async_id`. Never-used ids report `NotFound`.
    async fn request_status(&self, async_id: AsyncId) -> Result<JobStatus>;

    /// Delete the stored status of `async_id`, freeing it for reuse.
    async fn delete_status(&self, async_id: AsyncId) -> Result<()>;

    /// Delete every stored async status.
    async fn flush_status(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_params() {
        let cmd = AdminCommand::Restore {
            collection: "logs-tok".to_string(),
            location: "/mnt/backups".to_string(),
            name: "tok-logs-1".to_string(),
        };

        assert_eq!(cmd.action(), "RESTORE");
        assert_eq!(cmd.collection(), "logs-tok");
        assert_eq!(cmd.artifact(), "tok-logs-1");
        assert_eq!(
            cmd.params(),
            vec![
                ("action", "RESTORE".to_string()),
                ("collection", "logs-tok".to_string()),
                ("location", "/mnt/backups".to_string()),
                ("name", "tok-logs-1".to_string()),
            ]
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::NotFound.is_terminal());
        assert_eq!(JobState::NotFound.to_string(), "not_found");
    }
}
