//! Corpus snapshots and the append-only change log.
//!
//! # Responsibility
//! - Take a full point-in-time copy of the corpus before destructive runs.
//! - Record every tag change as one JSON line per entry, per batch run.
//!
//! # Invariants
//! - Snapshot failure is fatal to the enclosing execute batch; callers abort
//!   before any document mutation.
//! - Change-log appends are best-effort observability: a failed append is
//!   logged and never rolls back written changes.
//! - Snapshots are never deleted by this crate; restore is an external,
//!   administrative action.

use crate::vault::{VaultError, VaultStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Snapshot creation error. Always fatal to the enclosing batch.
#[derive(Debug)]
pub enum SnapshotError {
    Vault(VaultError),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Manifest(serde_json::Error),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vault(err) => write!(f, "snapshot source scan failed: {err}"),
            Self::Io { path, source } => {
                write!(f, "snapshot io failure at `{}`: {source}", path.display())
            }
            Self::Manifest(err) => write!(f, "snapshot manifest serialization failed: {err}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Vault(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Manifest(err) => Some(err),
        }
    }
}

impl From<VaultError> for SnapshotError {
    fn from(value: VaultError) -> Self {
        Self::Vault(value)
    }
}

/// Manifest written alongside every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub file_count: usize,
    pub total_bytes: u64,
    /// Digest over sorted relative paths and file contents.
    pub sha256: String,
    pub created_at: DateTime<Utc>,
}

/// Completed snapshot: directory plus its manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotInfo {
    pub directory: PathBuf,
    pub manifest: SnapshotManifest,
}

/// Copies every markdown file in the vault into a fresh snapshot directory
/// and writes `manifest.json`.
///
/// The directory is named `backup_<UTC timestamp>_<run id prefix>` under
/// `backups_dir`.
pub fn create_snapshot(
    store: &VaultStore,
    backups_dir: &Path,
    run_id: &str,
) -> SnapshotResult<SnapshotInfo> {
    let files = store.list_markdown()?;

    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let suffix: String = run_id.chars().take(8).collect();
    let directory = backups_dir.join(format!("backup_{stamp}_{suffix}"));
    fs::create_dir_all(&directory).map_err(|err| SnapshotError::Io {
        path: directory.clone(),
        source: err,
    })?;

    let mut hasher = Sha256::new();
    let mut total_bytes: u64 = 0;

    for relative in &files {
        let source_path = store.root().join(relative);
        let bytes = fs::read(&source_path).map_err(|err| SnapshotError::Io {
            path: source_path.clone(),
            source: err,
        })?;

        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        hasher.update(&bytes);
        total_bytes += bytes.len() as u64;

        let target = directory.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| SnapshotError::Io {
                path: parent.to_path_buf(),
                source: err,
            })?;
        }
        fs::write(&target, &bytes).map_err(|err| SnapshotError::Io {
            path: target.clone(),
            source: err,
        })?;
    }

    let manifest = SnapshotManifest {
        file_count: files.len(),
        total_bytes,
        sha256: format!("{:x}", hasher.finalize()),
        created_at: Utc::now(),
    };

    let manifest_path = directory.join("manifest.json");
    let manifest_json = serde_json::to_vec_pretty(&manifest).map_err(SnapshotError::Manifest)?;
    fs::write(&manifest_path, manifest_json).map_err(|err| SnapshotError::Io {
        path: manifest_path,
        source: err,
    })?;

    log::info!(
        "event=snapshot_create module=backup status=ok files={} bytes={} dir={}",
        manifest.file_count,
        manifest.total_bytes,
        directory.display()
    );

    Ok(SnapshotInfo {
        directory,
        manifest,
    })
}

/// One immutable change-log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub path: String,
    pub tags_before: Vec<String>,
    pub tags_after: Vec<String>,
    /// Mapping rule ids that fired for this document.
    pub rule_ids: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Append-only JSON-lines change log, one file per batch run.
#[derive(Debug, Clone)]
pub struct ChangeLogWriter {
    path: PathBuf,
}

impl ChangeLogWriter {
    /// Prepares a writer at `<dir>/changes_<run id>.jsonl`.
    pub fn create(dir: &Path, run_id: &str) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(format!("changes_{run_id}.jsonl")),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry. Failures bubble up so callers can log them; the
    /// batch itself never aborts on an append failure.
    pub fn append(&self, entry: &ChangeLogEntry) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)
    }
}
