//! Backup manifest: which artifact name actually succeeded per collection.
//!
//! Stored as `{token}-manifest.json` in the manifest directory, e.g.
//!
//! ```json
//! {
//!     "default": "nightly-default-0",
//!     "default_logs": "nightly-default_logs-2"
//! }
//! ```

use crate::{OrchestratorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Collection name -> succeeded artifact name, kept in sorted key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, collection: impl Into<String>, artifact: impl Into<String>) {
        self.entries.insert(collection.into(), artifact.into());
    }

    pub fn get(&self, collection: &str) -> Option<&str> {
        self.entries.get(collection).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Pretty JSON with 4-space indentation and sorted keys.
    pub fn to_pretty_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        String::from_utf8(buf)
            .map_err(|e| OrchestratorError::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Reads and writes manifests under one directory.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    dir: PathBuf,
}

impl ManifestStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, token: &str) -> PathBuf {
        self.dir.join(format!("{}-manifest.json", token))
    }

    /// Load the manifest a previous backup run wrote for `token`.
    pub fn load(&self, token: &str) -> Result<Manifest> {
        let path = self.path_for(token);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OrchestratorError::ManifestNotFound {
                    token: token.to_string(),
                    path,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let manifest: Manifest = serde_json::from_str(&content)?;
        info!(path = %path.display(), entries = manifest.len(), "Loaded manifest");
        Ok(manifest)
    }

    /// Write the whole manifest for `token`, replacing any previous one.
    /// The file only appears once fully written.
    pub fn save(&self, token: &str, manifest: &Manifest) -> Result<PathBuf> {
        let path = self.path_for(token);
        let tmp_path = self.dir.join(format!(".{}-manifest.json.tmp", token));
        let json = manifest.to_pretty_json()?;

        std::fs::create_dir_all(&self.dir)?;
        write_synced(&tmp_path, json.as_bytes())?;
        if let Err(e) = std::fs::rename(&tmp_path, &path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        info!(path = %path.display(), entries = manifest.len(), "Saved manifest");
        Ok(path)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.write_all(b"\n")?;
    file.sync_all()
}
