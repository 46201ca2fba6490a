//! Collection Backup Library
//!
//! Backup and restore orchestration for collections of a search-index
//! cluster, driven through its asynchronous collections admin API.

pub mod admin;
pub mod config;
pub mod jobs;
pub mod manifest;
pub mod orchestrator;
pub mod signal;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use orchestrator::{Mode, Orchestrator, RunReport, RunRequest, Selection};
pub use utils::errors::{OrchestratorError, Result};
