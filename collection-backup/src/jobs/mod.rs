//! Async job orchestration: async id allocation, submit-and-poll, and the
//! per-collection retry policies built on top of them.

pub mod allocator;
pub mod operation;
pub mod runner;

use std::time::Duration;

pub use allocator::JobIdAllocator;
pub use operation::{restored_name, BackupAttempt, CollectionOperations};
pub use runner::AsyncJobRunner;

/// Limits threaded through allocation, polling and retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSettings {
    /// Wall-clock budget for a single async job.
    pub timeout: Duration,
    /// Sleep between two REQUESTSTATUS calls.
    pub poll_interval: Duration,
    /// Maximum backup attempts per collection.
    pub retry_ceiling: u32,
    /// Size of the async id namespace, `[0, async_max)`.
    pub async_max: u32,
    /// Base delay before a retried backup attempt; zero disables backoff.
    pub retry_backoff: Duration,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3600),
            poll_interval: Duration::from_secs(15),
            retry_ceiling: 5,
            async_max: 100,
            retry_backoff: Duration::ZERO,
        }
    }
}
