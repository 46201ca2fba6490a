//! Collection Backup - Main entry point
//!
//! Backs up every selected collection under a token and writes
//! `{token}-manifest.json`, or restores them from that manifest.

use anyhow::Result;
use clap::Parser;
use collection_backup::admin::SolrAdminClient;
use collection_backup::manifest::ManifestStore;
use collection_backup::{signal, utils, Config, Mode, Orchestrator, RunReport, RunRequest, Selection};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Cluster node, host or host:port (port 8983 assumed)
    #[arg(long)]
    host: Option<String>,

    /// Token identifying this batch of backups
    #[arg(long, value_name = "TOKEN")]
    name: String,

    /// Shared storage path for the backup API
    #[arg(long)]
    path: Option<String>,

    /// Directory for the manifest file (default: current directory)
    #[arg(long, value_name = "DIR")]
    manifest: Option<PathBuf>,

    /// Only process these collections (repeatable)
    #[arg(short = 'c', long = "collection", value_name = "COLLECTION")]
    collections: Vec<String>,

    /// Never process these collections (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "COLLECTION")]
    excludes: Vec<String>,

    /// Perform a backup (default)
    #[arg(long, conflicts_with = "restore")]
    backup: bool,

    /// Perform a restore from the token's manifest
    #[arg(long)]
    restore: bool,

    /// Per-job timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Delete all stored async statuses before starting
    #[arg(long)]
    flush_status: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    // Command line wins over the file
    if let Some(host) = args.host {
        config.service.host = host;
    }
    if let Some(path) = args.path {
        config.storage.location = path;
    }
    if let Some(dir) = args.manifest {
        config.storage.manifest_dir = dir;
    }
    if let Some(timeout) = args.timeout {
        config.jobs.timeout_secs = timeout;
    }
    if args.flush_status {
        config.jobs.flush_status_on_start = true;
    }

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    config.validate(&args.name)?;

    tracing::info!(
        "Starting collection-backup v{} against {}",
        env!("CARGO_PKG_VERSION"),
        config.service.host
    );

    let settings = config.job_settings();
    let orchestrator = Orchestrator::new(
        SolrAdminClient::new(&config.service.host),
        config.storage.location.clone(),
        ManifestStore::new(config.storage.manifest_dir.clone()),
        &settings,
    );

    let request = RunRequest {
        mode: if args.restore && !args.backup {
            Mode::Restore
        } else {
            Mode::Backup
        },
        selection: Selection::new(args.collections, args.excludes),
        token: args.name,
        timeout: Duration::from_secs(config.jobs.timeout_secs),
        flush_status: config.jobs.flush_status_on_start,
    };

    let cancel = CancellationToken::new();
    tokio::spawn(signal::cancel_on_signal(cancel.clone()));

    let result = tokio::select! {
        result = orchestrator.run(&request) => result,
        _ = cancel.cancelled() => {
            tracing::warn!("Exiting...");
            std::process::exit(1);
        }
    };

    // The orchestrator has already logged the failing stage and error.
    let Ok(report) = result else {
        std::process::exit(1);
    };

    match report {
        RunReport::Backup { manifest, path } => {
            tracing::info!("Wrote manifest {}", path.display());
            println!("{}", manifest.to_pretty_json()?);
        }
        RunReport::Restore { restored } => {
            for (original, target) in restored {
                println!("{} -> {}", original, target);
            }
        }
    }

    Ok(())
}
