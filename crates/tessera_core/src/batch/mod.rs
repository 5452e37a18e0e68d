//! Batch orchestration over the vault corpus.
//!
//! # Responsibility
//! - Drive the per-file pipeline: normalize tags, apply the mapping table,
//!   classify, then report (dry run) or write + log (execute).
//! - Enforce the backup precondition before any destructive run.
//! - Aggregate before/after statistics and a failure taxonomy per run.
//!
//! # Invariants
//! - Per-file failures never abort the batch; the file is recorded as failed
//!   and processing continues.
//! - Execute mode never mutates a document unless a snapshot succeeded first.
//! - A dry run computes exactly the change set an execute run would write.

use crate::backup::{
    create_snapshot, ChangeLogEntry, ChangeLogWriter, SnapshotError, SnapshotInfo,
};
use crate::classify::{DocumentClassifier, HeuristicScorer};
use crate::config::EngineConfig;
use crate::db::{open_db, DbError};
use crate::model::coordinate::{CoordinateRecord, AXES};
use crate::repo::{CoordinateRepository, RepoError, SqliteCoordinateRepository};
use crate::tags::mapping::{apply_mappings, ChangeRecord};
use crate::tags::normalize::{normalize_tag, normalize_tags};
use crate::vault::{VaultError, VaultStore};
use chrono::Utc;
use log::{error, info};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

const TOP_TAGS_LIMIT: usize = 50;

pub type BatchResultOf<T> = Result<T, BatchError>;

/// Whether a run previews or persists its changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    DryRun,
    Execute,
}

impl RunMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::DryRun => "dry-run",
            Self::Execute => "execute",
        }
    }
}

/// Batch-level error; aborts happen before any document mutation.
#[derive(Debug)]
pub enum BatchError {
    Vault(VaultError),
    Snapshot(SnapshotError),
    Db(DbError),
    Repo(RepoError),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for BatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vault(err) => write!(f, "{err}"),
            Self::Snapshot(err) => write!(f, "backup precondition failed: {err}"),
            Self::Db(err) => write!(f, "coordinate store unavailable: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Io { path, source } => {
                write!(f, "state directory failure at `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for BatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Vault(err) => Some(err),
            Self::Snapshot(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<VaultError> for BatchError {
    fn from(value: VaultError) -> Self {
        Self::Vault(value)
    }
}

impl From<SnapshotError> for BatchError {
    fn from(value: SnapshotError) -> Self {
        Self::Snapshot(value)
    }
}

impl From<DbError> for BatchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for BatchError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Per-file failure taxonomy surfaced in run summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Malformed frontmatter; document flagged for manual repair.
    Parse,
    /// Document or coordinate-record write failed; batch continued.
    Write,
}

impl FailureKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Write => "write",
        }
    }
}

/// One failed file within an otherwise-continuing batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub path: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Planned (dry run) or applied (execute) tag change for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileChange {
    pub path: String,
    pub tags_before: Vec<String>,
    pub tags_after: Vec<String>,
    pub records: Vec<ChangeRecord>,
}

/// Outcome of one consolidation run.
#[derive(Debug)]
pub struct BatchResult {
    pub run_id: String,
    pub mode: RunMode,
    pub files_scanned: usize,
    pub files_changed: usize,
    pub total_tag_changes: usize,
    pub unique_tags_before: usize,
    pub unique_tags_after: usize,
    /// Axes that degraded to their fallback value across the corpus.
    pub axis_fallbacks: usize,
    pub changes: Vec<FileChange>,
    pub failures: Vec<BatchFailure>,
    pub snapshot: Option<SnapshotInfo>,
}

impl BatchResult {
    /// One-paragraph run summary for logs and CLI output.
    pub fn summary(&self) -> String {
        format!(
            "mode={} scanned={} changed={} tag_changes={} tags_before={} tags_after={} \
             fallback_axes={} failed={}",
            self.mode.label(),
            self.files_scanned,
            self.files_changed,
            self.total_tag_changes,
            self.unique_tags_before,
            self.unique_tags_after,
            self.axis_fallbacks,
            self.failures.len(),
        )
    }
}

/// Current tag landscape across the corpus.
#[derive(Debug)]
pub struct TagAudit {
    pub files_scanned: usize,
    pub total_tags: usize,
    pub total_instances: usize,
    /// Most frequent tags, count-descending, capped at fifty.
    pub top_tags: Vec<(String, usize)>,
    /// Lowercased key to the differing spellings observed.
    pub case_variants: BTreeMap<String, Vec<String>>,
    pub singleton_count: usize,
    pub failures: Vec<BatchFailure>,
}

/// Outcome of a corpus-wide coordinate extraction.
#[derive(Debug)]
pub struct ExtractReport {
    pub run_id: String,
    pub files_classified: usize,
    pub axis_fallbacks: usize,
    pub unique_coordinate_keys: usize,
    /// Unique keys over classified files; lower means a denser clustering.
    pub coordinate_density: f64,
    /// Axis label to (value, count), most common first.
    pub distributions: BTreeMap<String, Vec<(String, u64)>>,
    pub failures: Vec<BatchFailure>,
}

/// Explicit construction-time configuration; no ambient state.
#[derive(Debug, Clone)]
pub struct BatchContext {
    /// Vault root directory.
    pub vault_root: PathBuf,
    /// Directory for the coordinate store, backups and change logs.
    pub state_dir: PathBuf,
    pub config: EngineConfig,
}

/// Sequential batch orchestrator over one vault.
pub struct Orchestrator {
    store: VaultStore,
    state_dir: PathBuf,
    config: Arc<EngineConfig>,
    classifier: Box<dyn DocumentClassifier>,
}

impl Orchestrator {
    /// Builds an orchestrator using the built-in heuristic classifier.
    pub fn new(context: BatchContext) -> Self {
        let config = Arc::new(context.config);
        let classifier = Box::new(HeuristicScorer::new(Arc::clone(&config)));
        Self {
            store: VaultStore::new(context.vault_root),
            state_dir: context.state_dir,
            config,
            classifier,
        }
    }

    /// Builds an orchestrator with an injected classifier implementation.
    pub fn with_classifier(context: BatchContext, classifier: Box<dyn DocumentClassifier>) -> Self {
        let config = Arc::new(context.config);
        Self {
            store: VaultStore::new(context.vault_root),
            state_dir: context.state_dir,
            config,
            classifier,
        }
    }

    pub fn store(&self) -> &VaultStore {
        &self.store
    }

    fn db_path(&self) -> PathBuf {
        self.state_dir.join("coordinates.db")
    }

    fn backups_dir(&self) -> PathBuf {
        self.state_dir.join("backups")
    }

    fn changelogs_dir(&self) -> PathBuf {
        self.state_dir.join("changelogs")
    }

    fn ensure_state_dir(&self) -> BatchResultOf<()> {
        std::fs::create_dir_all(&self.state_dir).map_err(|err| BatchError::Io {
            path: self.state_dir.clone(),
            source: err,
        })
    }

    /// Reports the current tag landscape without touching any file.
    pub fn audit(&self) -> BatchResultOf<TagAudit> {
        let files = self.store.list_markdown()?;
        let mut counter: BTreeMap<String, usize> = BTreeMap::new();
        let mut failures = Vec::new();

        for relative in &files {
            let document = match self.store.load(relative) {
                Ok(document) => document,
                Err(err) => {
                    failures.push(load_failure(&err));
                    continue;
                }
            };
            for tag in document.tags() {
                *counter.entry(tag).or_insert(0) += 1;
            }
        }

        let total_instances = counter.values().sum();
        let singleton_count = counter.values().filter(|count| **count == 1).count();

        let mut top_tags: Vec<(String, usize)> =
            counter.iter().map(|(tag, count)| (tag.clone(), *count)).collect();
        top_tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_tags.truncate(TOP_TAGS_LIMIT);

        let mut by_lowercase: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for tag in counter.keys() {
            by_lowercase
                .entry(tag.to_lowercase())
                .or_default()
                .push(tag.clone());
        }
        let case_variants: BTreeMap<String, Vec<String>> = by_lowercase
            .into_iter()
            .filter(|(_, variants)| variants.len() > 1)
            .collect();

        Ok(TagAudit {
            files_scanned: files.len(),
            total_tags: counter.len(),
            total_instances,
            top_tags,
            case_variants,
            singleton_count,
            failures,
        })
    }

    /// Runs the consolidation pipeline in the given mode.
    ///
    /// Execute mode takes a snapshot first and aborts before touching any
    /// document if snapshotting fails.
    pub fn consolidate(&self, mode: RunMode) -> BatchResultOf<BatchResult> {
        let run_id = Uuid::new_v4().simple().to_string();
        let files = self.store.list_markdown()?;

        info!(
            "event=batch_run module=batch status=start mode={} run_id={} files={}",
            mode.label(),
            run_id,
            files.len()
        );

        let mut snapshot = None;
        let mut changelog: Option<ChangeLogWriter> = None;
        let mut connection = None;

        if mode == RunMode::Execute {
            self.ensure_state_dir()?;
            snapshot = Some(create_snapshot(&self.store, &self.backups_dir(), &run_id)?);
            connection = Some(open_db(self.db_path())?);
            changelog = match ChangeLogWriter::create(&self.changelogs_dir(), &run_id) {
                Ok(writer) => Some(writer),
                Err(err) => {
                    error!(
                        "event=changelog_create module=batch status=error run_id={run_id} error={err}"
                    );
                    None
                }
            };
        }

        let mut result = BatchResult {
            run_id: run_id.clone(),
            mode,
            files_scanned: 0,
            files_changed: 0,
            total_tag_changes: 0,
            unique_tags_before: 0,
            unique_tags_after: 0,
            axis_fallbacks: 0,
            changes: Vec::new(),
            failures: Vec::new(),
            snapshot,
        };
        let mut tags_before: BTreeSet<String> = BTreeSet::new();
        let mut tags_after: BTreeSet<String> = BTreeSet::new();

        for relative in &files {
            result.files_scanned += 1;

            let mut document = match self.store.load(relative) {
                Ok(document) => document,
                Err(err) => {
                    result.failures.push(load_failure(&err));
                    continue;
                }
            };

            let raw_tags = document.tags();
            let normalized = normalize_tags(&raw_tags);
            let outcome = apply_mappings(&normalized, self.config.mappings());

            let classification = self.classifier.classify(&document);
            result.axis_fallbacks += classification.fallback_count();

            tags_before.extend(raw_tags.iter().cloned());
            tags_after.extend(outcome.tags.iter().cloned());

            let renamed = raw_tags
                .iter()
                .filter(|raw| normalize_tag(raw).as_deref() != Some(raw.as_str()))
                .count();

            if outcome.tags != raw_tags {
                let change = FileChange {
                    path: relative.to_string_lossy().into_owned(),
                    tags_before: raw_tags.iter().cloned().collect(),
                    tags_after: outcome.tags.iter().cloned().collect(),
                    records: outcome.changes.clone(),
                };

                if mode == RunMode::Execute {
                    let Some(frontmatter) = document.frontmatter.as_mut() else {
                        continue;
                    };
                    frontmatter.tags = outcome.tags.clone();
                    if let Err(err) = self.store.write(&document) {
                        result.failures.push(BatchFailure {
                            path: change.path.clone(),
                            kind: FailureKind::Write,
                            message: err.to_string(),
                        });
                        continue;
                    }

                    if let Some(writer) = &changelog {
                        let entry = ChangeLogEntry {
                            path: change.path.clone(),
                            tags_before: change.tags_before.clone(),
                            tags_after: change.tags_after.clone(),
                            rule_ids: change
                                .records
                                .iter()
                                .map(|record| record.rule_id.clone())
                                .collect(),
                            timestamp: Utc::now(),
                        };
                        if let Err(err) = writer.append(&entry) {
                            error!(
                                "event=changelog_append module=batch status=error run_id={} path={} error={}",
                                run_id, change.path, err
                            );
                        }
                    }
                }

                result.total_tag_changes += change.records.len() + renamed;
                result.files_changed += 1;
                result.changes.push(change);
            }

            if let Some(conn) = &connection {
                let repo = SqliteCoordinateRepository::new(conn);
                let record = CoordinateRecord {
                    path: relative.to_string_lossy().into_owned(),
                    coordinate: classification.coordinate,
                    confidence: classification.confidence(),
                    updated_at: Utc::now().timestamp_millis(),
                };
                if let Err(err) = repo.upsert(&record) {
                    result.failures.push(BatchFailure {
                        path: record.path,
                        kind: FailureKind::Write,
                        message: format!("coordinate store: {err}"),
                    });
                }
            }
        }

        result.unique_tags_before = tags_before.len();
        result.unique_tags_after = tags_after.len();

        info!(
            "event=batch_run module=batch status=ok run_id={} {}",
            run_id,
            result.summary()
        );
        Ok(result)
    }

    /// Classifies the whole corpus and persists one record per document.
    ///
    /// Documents are never mutated, so no snapshot precondition applies.
    pub fn extract_coordinates(&self) -> BatchResultOf<ExtractReport> {
        let run_id = Uuid::new_v4().simple().to_string();
        let files = self.store.list_markdown()?;
        self.ensure_state_dir()?;
        let connection = open_db(self.db_path())?;
        let repo = SqliteCoordinateRepository::new(&connection);

        let mut report = ExtractReport {
            run_id: run_id.clone(),
            files_classified: 0,
            axis_fallbacks: 0,
            unique_coordinate_keys: 0,
            coordinate_density: 0.0,
            distributions: BTreeMap::new(),
            failures: Vec::new(),
        };
        let mut keys: BTreeSet<String> = BTreeSet::new();

        for relative in &files {
            let document = match self.store.load(relative) {
                Ok(document) => document,
                Err(err) => {
                    report.failures.push(load_failure(&err));
                    continue;
                }
            };

            let classification = self.classifier.classify(&document);
            report.axis_fallbacks += classification.fallback_count();
            keys.insert(classification.coordinate.key());

            let record = CoordinateRecord {
                path: relative.to_string_lossy().into_owned(),
                coordinate: classification.coordinate,
                confidence: classification.confidence(),
                updated_at: Utc::now().timestamp_millis(),
            };
            if let Err(err) = repo.upsert(&record) {
                report.failures.push(BatchFailure {
                    path: record.path,
                    kind: FailureKind::Write,
                    message: format!("coordinate store: {err}"),
                });
                continue;
            }
            report.files_classified += 1;
        }

        for axis in AXES {
            report
                .distributions
                .insert(axis.label().to_string(), repo.axis_distribution(axis)?);
        }
        report.unique_coordinate_keys = keys.len();
        if report.files_classified > 0 {
            report.coordinate_density =
                report.unique_coordinate_keys as f64 / report.files_classified as f64;
        }

        info!(
            "event=extract_coordinates module=batch status=ok run_id={} classified={} unique_keys={} fallback_axes={} failed={}",
            run_id,
            report.files_classified,
            report.unique_coordinate_keys,
            report.axis_fallbacks,
            report.failures.len()
        );
        Ok(report)
    }

    /// Takes a corpus snapshot outside any batch run.
    pub fn create_backup(&self) -> Result<SnapshotInfo, SnapshotError> {
        let run_id = Uuid::new_v4().simple().to_string();
        create_snapshot(&self.store, &self.backups_dir(), &run_id)
    }
}

/// Load failures skip the document but keep the batch going. Unreadable
/// files land in the parse bucket: skipped and flagged for manual repair.
fn load_failure(err: &VaultError) -> BatchFailure {
    BatchFailure {
        path: err.path().to_string_lossy().into_owned(),
        kind: FailureKind::Parse,
        message: err.to_string(),
    }
}
