//! Error types for backup and restore orchestration.

use crate::admin::{AsyncId, JobState};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No free async id in [0, {async_max}): {failed} held by failed jobs (release with --flush-status), the rest running")]
    ExhaustedPool { async_max: u32, failed: u32 },

    #[error("{action} submission rejected for async id {async_id} (HTTP {status}): {body}")]
    SubmissionFailed {
        action: &'static str,
        async_id: AsyncId,
        status: u16,
        body: String,
    },

    #[error("Async job {async_id} failed: {message}")]
    JobFailed { async_id: AsyncId, message: String },

    #[error("Async job {async_id} timed out after {}s (last state: {last_state})", .timeout.as_secs())]
    JobTimedOut {
        async_id: AsyncId,
        timeout: Duration,
        last_state: JobState,
    },

    #[error("Backup of '{collection}' failed after {attempts} attempts (last: {last_error})")]
    RetriesExhausted {
        collection: String,
        attempts: u32,
        last_error: Box<OrchestratorError>,
    },

    #[error("No manifest for token '{token}' at {}", .path.display())]
    ManifestNotFound { token: String, path: PathBuf },

    #[error("Manifest has no entry for collection '{collection}'")]
    MissingManifestEntry { collection: String },

    #[error("DELETESTATUS failed for {target} (HTTP {status})")]
    DeleteFailed { target: String, status: u16 },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
