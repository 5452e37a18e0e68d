//! Tag engine: canonical normalization and mapping-table application.
//!
//! # Responsibility
//! - Reduce free-form tag spellings to one canonical form.
//! - Apply the phased consolidation rule table with full change tracking.
//!
//! # Invariants
//! - Both operations are pure; nothing here touches the filesystem.
//! - Applying the full rule table twice equals applying it once (enforced by
//!   table validation at config load).

pub mod mapping;
pub mod normalize;

pub use mapping::{
    ChangeRecord, MappingOutcome, MappingPhase, MappingRule, MappingTable, MappingTarget,
};
pub use normalize::{normalize_tag, normalize_tags};
