//! Async id allocation in a namespace shared with other clients.
//!
//! Nothing here holds a lock: the service is the only source of truth for
//! which ids are taken. Ids are probed in random order and an id whose job
//! already completed is reclaimed with DELETESTATUS before reuse.

use crate::admin::{AdminApi, AsyncId, JobState};
use crate::{OrchestratorError, Result};
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct JobIdAllocator {
    async_max: u32,
}

impl JobIdAllocator {
    pub fn new(async_max: u32) -> Self {
        Self { async_max }
    }

    /// Every id in `[0, async_max)`, shuffled.
    pub fn probe_order(&self) -> Vec<AsyncId> {
        let mut ids: Vec<AsyncId> = (0..self.async_max).collect();
        ids.shuffle(&mut rand::thread_rng());
        ids
    }

    /// Find a free or reclaimable id.
    pub async fn allocate<A: AdminApi + ?Sized>(&self, api: &A) -> Result<AsyncId> {
        let order = self.probe_order();
        self.allocate_from(api, order).await
    }

    /// Probe ids in the given order. A `failed` id is left alone like a
    /// `running` one: its status is the only trace of that failure.
    pub async fn allocate_from<A: AdminApi + ?Sized>(
        &self,
        api: &A,
        order: impl IntoIterator<Item = AsyncId> + Send,
    ) -> Result<AsyncId> {
        let mut failed = 0u32;

        for async_id in order {
            let status = api.request_status(async_id).await?;
            match status.state {
                JobState::NotFound => {
                    debug!(async_id, "Allocated free async id");
                    return Ok(async_id);
                }
                JobState::Completed => {
                    api.delete_status(async_id).await?;
                    info!(async_id, "Reclaimed completed async id");
                    return Ok(async_id);
                }
                JobState::Failed => {
                    failed += 1;
                    debug!(async_id, "Async id held by a failed job, probing next");
                }
                JobState::Running => {
                    debug!(async_id, "Async id in use, probing next");
                }
            }
        }

        if failed > 0 {
            warn!(
                failed,
                async_max = self.async_max,
                "Async ids held by failed jobs; run with --flush-status to release them"
            );
        }
        Err(OrchestratorError::ExhaustedPool {
            async_max: self.async_max,
            failed,
        })
    }
}
