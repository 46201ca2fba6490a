//! Backup and restore of a single collection.
//!
//! Backups are retried under a fresh artifact name after a failed job, since
//! the service will not reliably reuse the name of a failed attempt. Restores
//! run exactly once: re-issuing one under the same target is not safe.

use super::{AsyncJobRunner, JobSettings};
use crate::admin::{AdminApi, AdminCommand};
use crate::{OrchestratorError, Result};
use std::time::Duration;
use tracing::{info, warn};

/// One backup try for a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupAttempt<'a> {
    pub base_token: &'a str,
    pub collection: &'a str,
    pub attempt: u32,
}

impl BackupAttempt<'_> {
    /// `{base_token}-{collection}-{attempt}`
    pub fn candidate_name(&self) -> String {
        format!("{}-{}-{}", self.base_token, self.collection, self.attempt)
    }
}

/// Name of the collection a restore creates: `{original}-{base_token}`.
pub fn restored_name(original_collection: &str, base_token: &str) -> String {
    format!("{}-{}", original_collection, base_token)
}

pub struct CollectionOperations<A> {
    runner: AsyncJobRunner<A>,
    location: String,
    retry_ceiling: u32,
    retry_backoff: Duration,
}

impl<A: AdminApi> CollectionOperations<A> {
    pub fn new(api: A, location: impl Into<String>, settings: &JobSettings) -> Self {
        Self {
            runner: AsyncJobRunner::new(api, settings),
            location: location.into(),
            retry_ceiling: settings.retry_ceiling,
            retry_backoff: settings.retry_backoff,
        }
    }

    pub fn api(&self) -> &A {
        self.runner.api()
    }

    /// Back up `collection`, returning the artifact name that succeeded.
    ///
    /// Only `JobFailed` is retried. A timeout propagates at once so a hung
    /// job is never compounded by another one.
    pub async fn backup(&self, base_token: &str, collection: &str, timeout: Duration) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..self.retry_ceiling {
            if attempt > 0 {
                self.backoff(attempt - 1).await;
            }

            let candidate = BackupAttempt {
                base_token,
                collection,
                attempt,
            }
            .candidate_name();
            info!(collection, attempt, name = %candidate, "Starting backup attempt");

            let command = AdminCommand::Backup {
                collection: collection.to_string(),
                location: self.location.clone(),
                name: candidate.clone(),
            };

            match self.runner.run(&command, timeout).await {
                Ok(outcome) => {
                    info!(
                        collection,
                        attempt,
                        name = %candidate,
                        async_id = outcome.async_id,
                        polls = outcome.polls,
                        "Backup succeeded"
                    );
                    return Ok(candidate);
                }
                Err(err @ OrchestratorError::JobFailed { .. }) => {
                    warn!(collection, attempt, name = %candidate, error = %err, "Backup attempt failed");
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(OrchestratorError::RetriesExhausted {
            collection: collection.to_string(),
            attempts: self.retry_ceiling,
            last_error: Box::new(last_error.unwrap_or_else(|| {
                OrchestratorError::Config("retry ceiling is zero".to_string())
            })),
        })
    }

    /// Restore `artifact_name` as `{original_collection}-{base_token}`.
    pub async fn restore(
        &self,
        base_token: &str,
        artifact_name: &str,
        original_collection: &str,
        timeout: Duration,
    ) -> Result<String> {
        let target = restored_name(original_collection, base_token);
        info!(collection = original_collection, artifact = artifact_name, target = %target, "Starting restore");

        let command = AdminCommand::Restore {
            collection: target.clone(),
            location: self.location.clone(),
            name: artifact_name.to_string(),
        };
        let outcome = self.runner.run(&command, timeout).await?;

        info!(
            collection = original_collection,
            target = %target,
            async_id = outcome.async_id,
            polls = outcome.polls,
            "Restore succeeded"
        );
        Ok(target)
    }

    /// Exponential delay before retrying after failed attempt `attempt`.
    async fn backoff(&self, attempt: u32) {
        if self.retry_backoff.is_zero() {
            return;
        }
        let delay = self.retry_backoff.saturating_mul(2u32.saturating_pow(attempt));
        info!(delay_secs = delay.as_secs(), "Backing off before next attempt");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::fake::FakeAdminApi;
    use crate::admin::JobState;

    const TIMEOUT: Duration = Duration::from_secs(600);

    fn operations(api: &FakeAdminApi) -> CollectionOperations<FakeAdminApi> {
        CollectionOperations::new(api.clone(), "/mnt/backups", &JobSettings::default())
    }

    fn submitted_names(api: &FakeAdminApi) -> Vec<String> {
        api.submissions()
            .into_iter()
            .map(|(cmd, _)| cmd.artifact().to_string())
            .collect()
    }

    #[test]
    fn test_candidate_name() {
        let attempt = BackupAttempt {
            base_token: "tok",
            collection: "default_logs",
            attempt: 3,
        };
        assert_eq!(attempt.candidate_name(), "tok-default_logs-3");
        assert_eq!(restored_name("logs", "restoretoken"), "logs-restoretoken");
    }

    #[tokio::test(start_paused = true)]
    async fn test_backup_first_attempt() {
        let api = FakeAdminApi::new();

        let name = operations(&api).backup("tok", "logs", TIMEOUT).await.unwrap();

        assert_eq!(name, "tok-logs-0");
        assert_eq!(submitted_names(&api), vec!["tok-logs-0"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backup_renames_after_failures() {
        let api = FakeAdminApi::new();
        api.script(&[JobState::Running, JobState::Failed]);
        api.script(&[JobState::Failed]);
        api.script(&[JobState::Running, JobState::Completed]);

        let name = operations(&api).backup("tok", "logs", TIMEOUT).await.unwrap();

        assert_eq!(name, "tok-logs-2");
        assert_eq!(submitted_names(&api), vec!["tok-logs-0", "tok-logs-1", "tok-logs-2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backup_retries_exhausted() {
        let api = FakeAdminApi::new();
        for _ in 0..5 {
            api.script(&[JobState::Failed]);
        }

        let err = operations(&api).backup("tok", "logs", TIMEOUT).await.unwrap_err();

        match err {
            OrchestratorError::RetriesExhausted {
                collection,
                attempts,
                last_error,
            } => {
                assert_eq!(collection, "logs");
                assert_eq!(attempts, 5);
                assert!(matches!(*last_error, OrchestratorError::JobFailed { .. }));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(api.submissions().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backup_timeout_is_not_retried() {
        let api = FakeAdminApi::new();
        api.script(&[JobState::Failed]);
        api.script(&[JobState::Running]);

        let err = operations(&api)
            .backup("tok", "logs", Duration::from_secs(30))
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::JobTimedOut { .. }));
        assert_eq!(submitted_names(&api), vec!["tok-logs-0", "tok-logs-1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backup_submission_failure_propagates() {
        let api = FakeAdminApi::new();
        api.reject_next_submission();

        let err = operations(&api).backup("tok", "logs", TIMEOUT).await.unwrap_err();

        assert!(matches!(err, OrchestratorError::SubmissionFailed { .. }));
        assert_eq!(api.submissions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_between_attempts() {
        let api = FakeAdminApi::new();
        api.script(&[JobState::Failed]);
        api.script(&[JobState::Failed]);
        let settings = JobSettings {
            retry_backoff: Duration::from_secs(1),
            ..JobSettings::default()
        };
        let ops = CollectionOperations::new(api.clone(), "/mnt/backups", &settings);

        let started = tokio::time::Instant::now();
        let name = ops.backup("tok", "logs", TIMEOUT).await.unwrap();

        assert_eq!(name, "tok-logs-2");
        // 1s after attempt 0, 2s after attempt 1.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_single_attempt() {
        let api = FakeAdminApi::new();
        api.script(&[JobState::Failed]);

        let err = operations(&api)
            .restore("restoretoken", "tok-logs-1", "logs", TIMEOUT)
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::JobFailed { .. }));
        assert_eq!(api.submissions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_command() {
        let api = FakeAdminApi::new();

        let target = operations(&api)
            .restore("restoretoken", "tok-logs-1", "logs", TIMEOUT)
            .await
            .unwrap();

        assert_eq!(target, "logs-restoretoken");
        let (command, _) = api.submissions().remove(0);
        assert_eq!(
            command,
            AdminCommand::Restore {
                collection: "logs-restoretoken".to_string(),
                location: "/mnt/backups".to_string(),
                name: "tok-logs-1".to_string(),
            }
        );
    }
}
