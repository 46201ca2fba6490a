//! Submit one async command and poll it to a terminal state.
//!
//! ```text
//! submitted -> polling -> completed | failed | timed_out
//! ```
//!
//! The async id used by a run is never released here; it becomes reusable
//! once some allocator observes it `completed` and deletes its status.

use super::{JobIdAllocator, JobSettings};
use crate::admin::{AdminApi, AdminCommand, AsyncId, JobState, JobStatus};
use crate::{OrchestratorError, Result};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Terminal success of one async job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub async_id: AsyncId,
    pub status: JobStatus,
    pub polls: u32,
    pub elapsed: Duration,
}

pub struct AsyncJobRunner<A> {
    api: A,
    allocator: JobIdAllocator,
    poll_interval: Duration,
}

impl<A: AdminApi> AsyncJobRunner<A> {
    pub fn new(api: A, settings: &JobSettings) -> Self {
        Self {
            api,
            allocator: JobIdAllocator::new(settings.async_max),
            poll_interval: settings.poll_interval,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Run `command` to completion, failing with `SubmissionFailed`,
    /// `JobFailed` or `JobTimedOut`.
    pub async fn run(&self, command: &AdminCommand, timeout: Duration) -> Result<JobOutcome> {
        let async_id = self.allocator.allocate(&self.api).await?;
        self.run_with_id(command, async_id, timeout).await
    }

    /// Run `command` under an already allocated `async_id`.
    pub async fn run_with_id(
        &self,
        command: &AdminCommand,
        async_id: AsyncId,
        timeout: Duration,
    ) -> Result<JobOutcome> {
        info!(
            action = command.action(),
            collection = command.collection(),
            name = command.artifact(),
            async_id,
            "Submitting async job"
        );
        self.api.submit(command, async_id).await?;

        let started = Instant::now();
        let mut polls = 0u32;

        loop {
            let status = self.api.request_status(async_id).await?;
            polls += 1;
            info!(
                action = command.action(),
                collection = command.collection(),
                async_id,
                poll = polls,
                state = %status.state,
                elapsed_secs = started.elapsed().as_secs(),
                "Polled async job"
            );

            match status.state {
                JobState::Completed => {
                    return Ok(JobOutcome {
                        async_id,
                        status,
                        polls,
                        elapsed: started.elapsed(),
                    });
                }
                JobState::Failed => {
                    warn!(async_id, msg = %status.message, "Async job failed");
                    return Err(OrchestratorError::JobFailed {
                        async_id,
                        message: status.message,
                    });
                }
                JobState::Running | JobState::NotFound => {}
            }

            tokio::time::sleep(self.poll_interval).await;

            if started.elapsed() >= timeout {
                warn!(async_id, last_state = %status.state, "Async job timed out, leaving it running remotely");
                return Err(OrchestratorError::JobTimedOut {
                    async_id,
                    timeout,
                    last_state: status.state,
                });
            }
        }
    }
}
