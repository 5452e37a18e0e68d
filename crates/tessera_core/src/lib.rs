//! Core engine for Tessera: tag consolidation and 4D coordinate
//! classification over a markdown vault.
//! This crate is the single source of truth for business invariants.

pub mod backup;
pub mod batch;
pub mod classify;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod tags;
pub mod vault;

pub use backup::{
    create_snapshot, ChangeLogEntry, ChangeLogWriter, SnapshotError, SnapshotInfo,
    SnapshotManifest,
};
pub use batch::{
    BatchContext, BatchError, BatchFailure, BatchResult, ExtractReport, FailureKind, FileChange,
    Orchestrator, RunMode, TagAudit,
};
pub use classify::{
    AxisSuggester, DocumentClassifier, HeuristicScorer, SuggestError, ValidatedClassifier,
};
pub use config::{ConfigError, EngineConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::coordinate::{
    AssignmentSource, Axis, AxisAssignment, Classification, Coordinate, CoordinateRecord, AXES,
};
pub use model::document::{Document, Frontmatter};
pub use repo::{CoordinateRepository, RepoError, SqliteCoordinateRepository};
pub use tags::mapping::apply_mappings;
pub use tags::{
    ChangeRecord, MappingOutcome, MappingPhase, MappingRule, MappingTable, MappingTarget,
};
pub use tags::{normalize_tag, normalize_tags};
pub use vault::{VaultError, VaultStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
