//! Coordinate classification: pattern scoring plus an optional external
//! classifier seam.
//!
//! # Responsibility
//! - Assign every document exactly one value per axis, deterministically.
//! - Keep the external classifier behind a trait so tests and batch runs can
//!   inject either implementation.
//!
//! # Invariants
//! - Classification is total: it never fails a document, only degrades an
//!   axis to its fallback value.
//! - Identical document text, tags and configuration always yield the same
//!   coordinate, including tie-breaks.

pub mod external;
pub mod heuristic;
pub mod patterns;

pub use external::{AxisSuggester, SuggestError, ValidatedClassifier};
pub use heuristic::HeuristicScorer;
pub use patterns::MarkerHits;

use crate::model::coordinate::Classification;
use crate::model::document::Document;

/// Classifier seam used by the batch orchestrator.
pub trait DocumentClassifier {
    /// Classifies one document. Total: always returns one value per axis.
    fn classify(&self, document: &Document) -> Classification;
}
