//! Configuration management for the orchestrator.
//!
//! Loads an optional TOML file; command-line flags override it in `main`.

use crate::jobs::JobSettings;
use crate::{OrchestratorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub jobs: JobsConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Cluster node, `host` or `host:port`
    #[serde(default = "default_host")]
    pub host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Shared storage path as seen by the cluster nodes
    #[serde(default)]
    pub location: String,

    /// Directory holding `{token}-manifest.json` files
    #[serde(default = "default_manifest_dir")]
    pub manifest_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Per-job wall-clock timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sleep between status polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Backup attempts per collection
    #[serde(default = "default_retry_ceiling")]
    pub retry_ceiling: u32,

    /// Async ids are drawn from `[0, async_max)`
    #[serde(default = "default_async_max")]
    pub async_max: u32,

    /// Base of the exponential delay between backup attempts (0 = none)
    #[serde(default)]
    pub retry_backoff_secs: u64,

    /// Flush all stored async statuses before the run
    #[serde(default)]
    pub flush_status_on_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_host() -> String {
    "localhost".to_string()
}

fn default_manifest_dir() -> PathBuf {
    PathBuf::from("./")
}

fn default_timeout_secs() -> u64 {
    3600
}

fn default_poll_interval_secs() -> u64 {
    15
}

fn default_retry_ceiling() -> u32 {
    5
}

fn default_async_max() -> u32 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { host: default_host() }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            location: String::new(),
            manifest_dir: default_manifest_dir(),
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            retry_ceiling: default_retry_ceiling(),
            async_max: default_async_max(),
            retry_backoff_secs: 0,
            flush_status_on_start: false,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Reject values no run can succeed with, before any remote call.
    pub fn validate(&self, token: &str) -> Result<()> {
        if token.trim().is_empty() {
            return Err(OrchestratorError::Config("backup token must not be empty".into()));
        }
        if self.storage.location.trim().is_empty() {
            return Err(OrchestratorError::Config("storage location must not be empty".into()));
        }
        if self.service.host.trim().is_empty() {
            return Err(OrchestratorError::Config("host must not be empty".into()));
        }
        if self.jobs.retry_ceiling == 0 {
            return Err(OrchestratorError::Config("retry_ceiling must be at least 1".into()));
        }
        if self.jobs.async_max == 0 {
            return Err(OrchestratorError::Config("async_max must be at least 1".into()));
        }
        Ok(())
    }

    pub fn job_settings(&self) -> JobSettings {
        JobSettings {
            timeout: Duration::from_secs(self.jobs.timeout_secs),
            poll_interval: Duration::from_secs(self.jobs.poll_interval_secs),
            retry_ceiling: self.jobs.retry_ceiling,
            async_max: self.jobs.async_max,
            retry_backoff: Duration::from_secs(self.jobs.retry_backoff_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.service.host, "localhost");
        assert_eq!(config.storage.manifest_dir, PathBuf::from("./"));
        assert_eq!(config.job_settings(), JobSettings::default());
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            r#"
[service]
host = "solr-1.internal:7574"

[storage]
location = "/mnt/solr-backups"

[jobs]
retry_ceiling = 3
retry_backoff_secs = 2
"#
        )?;
        file.flush()?;

        let config = Config::from_file(file.path())?;

        assert_eq!(config.service.host, "solr-1.internal:7574");
        assert_eq!(config.storage.location, "/mnt/solr-backups");
        assert_eq!(config.storage.manifest_dir, PathBuf::from("./"));
        assert_eq!(config.jobs.retry_ceiling, 3);
        assert_eq!(config.jobs.poll_interval_secs, 15);
        assert_eq!(config.job_settings().retry_backoff, Duration::from_secs(2));
        assert_eq!(config.log.level, "info");
        Ok(())
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(matches!(config.validate("tok"), Err(OrchestratorError::Config(_))));

        config.storage.location = "/mnt/solr-backups".to_string();
        assert!(config.validate("tok").is_ok());
        assert!(config.validate("  ").is_err());

        config.jobs.retry_ceiling = 0;
        assert!(config.validate("tok").is_err());
    }
}
