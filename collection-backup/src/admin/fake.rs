//! Scripted in-memory `AdminApi` for tests.
//!
//! Each submission consumes one script: the sequence of states REQUESTSTATUS
//! reports for that async id, one per poll, repeating the last one. Ids can
//! also be pre-occupied to stand in for other processes sharing the namespace.

use super::{AdminApi, AdminCommand, AsyncId, JobState, JobStatus};
use crate::{OrchestratorError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Recorded DELETESTATUS call; `None` is a flush.
pub type DeleteCall = Option<AsyncId>;

#[derive(Default)]
struct FakeState {
    collections: Vec<String>,
    statuses: HashMap<AsyncId, VecDeque<JobState>>,
    scripts: VecDeque<Vec<JobState>>,
    rejected_submissions: VecDeque<bool>,
    submissions: Vec<(AdminCommand, AsyncId)>,
    deletes: Vec<DeleteCall>,
    status_queries: Vec<AsyncId>,
    cluster_status_calls: usize,
    fail_deletes: bool,
}

#[derive(Clone, Default)]
pub struct FakeAdminApi {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeAdminApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collections(names: &[&str]) -> Self {
        let fake = Self::new();
        fake.inner.lock().unwrap().collections = names.iter().map(|s| s.to_string()).collect();
        fake
    }

    /// Mark `async_id` as held by someone else in `state`.
    pub fn occupy(&self, async_id: AsyncId, state: JobState) {
        self.inner
            .lock()
            .unwrap()
            .statuses
            .insert(async_id, VecDeque::from([state]));
    }

    /// Queue the state sequence reported for the next submission.
    /// Submissions without a queued script complete on the first poll.
    pub fn script(&self, states: &[JobState]) {
        self.inner.lock().unwrap().scripts.push_back(states.to_vec());
    }

    /// Reject the next submission with HTTP 500.
    pub fn reject_next_submission(&self) {
        self.inner.lock().unwrap().rejected_submissions.push_back(true);
    }

    pub fn fail_deletes(&self) {
        self.inner.lock().unwrap().fail_deletes = true;
    }

    pub fn submissions(&self) -> Vec<(AdminCommand, AsyncId)> {
        self.inner.lock().unwrap().submissions.clone()
    }

    pub fn deletes(&self) -> Vec<DeleteCall> {
        self.inner.lock().unwrap().deletes.clone()
    }

    pub fn status_queries(&self) -> Vec<AsyncId> {
        self.inner.lock().unwrap().status_queries.clone()
    }

    /// Submissions, status queries and deletes made so far.
    pub fn async_call_count(&self) -> usize {
        let state = self.inner.lock().unwrap();
        state.submissions.len() + state.deletes.len() + state.status_queries.len()
    }

    pub fn cluster_status_calls(&self) -> usize {
        self.inner.lock().unwrap().cluster_status_calls
    }
}

#[async_trait]
impl AdminApi for FakeAdminApi {
    async fn cluster_collections(&self) -> Result<Vec<String>> {
        let mut state = self.inner.lock().unwrap();
        state.cluster_status_calls += 1;
        Ok(state.collections.clone())
    }

    async fn submit(&self, command: &AdminCommand, async_id: AsyncId) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.submissions.push((command.clone(), async_id));

        if state.rejected_submissions.pop_front().unwrap_or(false) {
            return Err(OrchestratorError::SubmissionFailed {
                action: command.action(),
                async_id,
                status: 500,
                body: "rejected".to_string(),
            });
        }

        let script = state
            .scripts
            .pop_front()
            .unwrap_or_else(|| vec![JobState::Completed]);
        state.statuses.insert(async_id, script.into());
        Ok(())
    }

    async fn request_status(&self, async_id: AsyncId) -> Result<JobStatus> {
        let mut state = self.inner.lock().unwrap();
        state.status_queries.push(async_id);

        let job_state = match state.statuses.get_mut(&async_id) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(JobState::NotFound),
            Some(queue) => queue.front().copied().unwrap_or(JobState::NotFound),
            None => JobState::NotFound,
        };
        Ok(JobStatus::new(job_state, format!("async id {} is {}", async_id, job_state)))
    }

    async fn delete_status(&self, async_id: AsyncId) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.deletes.push(Some(async_id));
        if state.fail_deletes {
            return Err(OrchestratorError::DeleteFailed {
                target: format!("async id {}", async_id),
                status: 500,
            });
        }
        state.statuses.remove(&async_id);
        Ok(())
    }

    async fn flush_status(&self) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.deletes.push(None);
        if state.fail_deletes {
            return Err(OrchestratorError::DeleteFailed {
                target: "all async ids".to_string(),
                status: 500,
            });
        }
        state
            .statuses
            .retain(|_, queue| !matches!(queue.back(), Some(JobState::Completed | JobState::Failed)));
        Ok(())
    }
}
