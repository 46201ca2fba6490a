//! Run-level driver: select collections, back up or restore each one in the
//! order the cluster reports them, and hand the manifest to the store.
//! Restores also cover manifest entries the cluster no longer has.
//!
//! The first unrecoverable error aborts the run. A backup run writes its
//! manifest once, after every selected collection succeeded, so a partial
//! run never leaves a manifest behind.

use crate::admin::AdminApi;
use crate::jobs::{CollectionOperations, JobSettings};
use crate::manifest::{Manifest, ManifestStore};
use crate::{OrchestratorError, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Backup,
    Restore,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Backup => f.write_str("backup"),
            Mode::Restore => f.write_str("restore"),
        }
    }
}

/// Include/exclude filter, applied the same way in both modes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub targets: Vec<String>,
    pub excludes: Vec<String>,
}

impl Selection {
    pub fn new(targets: Vec<String>, excludes: Vec<String>) -> Self {
        Self { targets, excludes }
    }

    /// An empty target list selects everything not excluded.
    pub fn includes(&self, collection: &str) -> bool {
        (self.targets.is_empty() || self.targets.iter().any(|t| t == collection))
            && !self.excludes.iter().any(|x| x == collection)
    }

    /// Selected collections, in `universe` order.
    pub fn apply(&self, universe: Vec<String>) -> Vec<String> {
        universe
            .into_iter()
            .filter(|collection| {
                let keep = self.includes(collection);
                if !keep {
                    debug!(collection = %collection, "Skipping collection");
                }
                keep
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub mode: Mode,
    pub selection: Selection,
    pub token: String,
    pub timeout: Duration,
    /// Flush every stored async status before processing any collection.
    pub flush_status: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    Backup {
        manifest: Manifest,
        path: PathBuf,
    },
    /// `(original collection, restored collection)` pairs.
    Restore { restored: Vec<(String, String)> },
}

pub struct Orchestrator<A> {
    operations: CollectionOperations<A>,
    store: ManifestStore,
}

impl<A: AdminApi> Orchestrator<A> {
    pub fn new(api: A, location: impl Into<String>, store: ManifestStore, settings: &JobSettings) -> Self {
        Self {
            operations: CollectionOperations::new(api, location, settings),
            store,
        }
    }

    pub async fn run(&self, request: &RunRequest) -> Result<RunReport> {
        info!(mode = %request.mode, token = %request.token, "Starting run");

        match request.mode {
            Mode::Backup => self.run_backup(request).await,
            Mode::Restore => self.run_restore(request).await,
        }
    }

    async fn run_backup(&self, request: &RunRequest) -> Result<RunReport> {
        self.flush_if_requested(request).await?;

        let universe = self.cluster_collections().await?;
        let selected = request.selection.apply(universe);
        info!(count = selected.len(), "Selected collections");

        let mut manifest = Manifest::new();
        for collection in &selected {
            info!(collection = %collection, "Backing up collection");
            let artifact = self
                .operations
                .backup(&request.token, collection, request.timeout)
                .await
                .inspect_err(|e| log_abort("backup", Some(collection.as_str()), e))?;
            manifest.record(collection.as_str(), artifact);
        }

        let path = self
            .store
            .save(&request.token, &manifest)
            .inspect_err(|e| log_abort("manifest_save", None, e))?;
        Ok(RunReport::Backup { manifest, path })
    }

    async fn run_restore(&self, request: &RunRequest) -> Result<RunReport> {
        // Restore input is read before anything touches the cluster.
        let manifest = self
            .store
            .load(&request.token)
            .inspect_err(|e| log_abort("manifest_load", None, e))?;

        let live = self.cluster_collections().await?;
        let plan = restore_plan(&request.selection, live, &manifest)
            .inspect_err(|e| log_abort("restore_plan", None, e))?;
        info!(count = plan.len(), "Selected collections");

        // A flush wipes statuses of other clients too; only issue it for a
        // plan that can run to the end.
        self.flush_if_requested(request).await?;

        let mut restored = Vec::with_capacity(plan.len());
        for (collection, artifact) in plan {
            info!(collection = %collection, artifact, "Restoring collection");
            let target = self
                .operations
                .restore(&request.token, artifact, &collection, request.timeout)
                .await
                .inspect_err(|e| log_abort("restore", Some(collection.as_str()), e))?;
            restored.push((collection, target));
        }

        Ok(RunReport::Restore { restored })
    }

    async fn flush_if_requested(&self, request: &RunRequest) -> Result<()> {
        if request.flush_status {
            self.operations
                .api()
                .flush_status()
                .await
                .inspect_err(|e| log_abort("flush_status", None, e))?;
            info!("Flushed stored async statuses");
        }
        Ok(())
    }

    async fn cluster_collections(&self) -> Result<Vec<String>> {
        self.operations
            .api()
            .cluster_collections()
            .await
            .inspect_err(|e| log_abort("cluster_status", None, e))
    }
}

/// Collections a restore processes, each with its recorded artifact.
///
/// Candidates are the live collections in cluster order followed by manifest
/// entries the cluster no longer has. Fails if an explicit target is in
/// neither, or a selected collection has no manifest entry.
fn restore_plan<'m>(
    selection: &Selection,
    live: Vec<String>,
    manifest: &'m Manifest,
) -> Result<Vec<(String, &'m str)>> {
    let mut universe = live;
    for (collection, _) in manifest.iter() {
        if !universe.iter().any(|c| c == collection) {
            universe.push(collection.to_string());
        }
    }

    if let Some(target) = selection
        .targets
        .iter()
        .find(|t| selection.includes(t.as_str()) && !universe.contains(*t))
    {
        return Err(OrchestratorError::MissingManifestEntry {
            collection: target.clone(),
        });
    }

    selection
        .apply(universe)
        .into_iter()
        .map(|collection| match manifest.get(&collection) {
            Some(artifact) => Ok((collection, artifact)),
            None => Err(OrchestratorError::MissingManifestEntry { collection }),
        })
        .collect()
}

/// The single report of a run-ending error.
fn log_abort(stage: &'static str, collection: Option<&str>, err: &OrchestratorError) {
    match collection {
        Some(collection) => error!(collection, stage, error = %err, "Aborting run"),
        None => error!(stage, error = %err, "Aborting run"),
    }
}
