//! Deterministic pattern-scoring classifier.
//!
//! # Responsibility
//! - Score every configured candidate per axis and pick the strict maximum.
//! - Resolve ties reproducibly: configured priority order below the
//!   multi-candidate threshold, a path-seeded pick at or above it.
//!
//! # Invariants
//! - Same text + tags + config always produce the same coordinate.
//! - An axis with no candidate above zero degrades to its fallback value and
//!   is reported as a fallback, never as an error.

use crate::classify::patterns::{count_marker_hits, MarkerHits};
use crate::classify::DocumentClassifier;
use crate::config::EngineConfig;
use crate::model::coordinate::{
    AssignmentSource, Axis, AxisAssignment, Classification, Coordinate, AXES,
};
use crate::model::document::Document;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

/// Pattern-scoring classifier driven entirely by `EngineConfig`.
#[derive(Clone)]
pub struct HeuristicScorer {
    config: Arc<EngineConfig>,
}

impl HeuristicScorer {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Classifies one document from its body text and tags.
    pub fn classify_document(&self, document: &Document) -> Classification {
        let text = document.classification_text();
        let hits = count_marker_hits(&self.config, &text);
        let assignments = AXES.map(|axis| self.score_axis(axis, &hits, &document.path));
        Classification {
            coordinate: Coordinate {
                structure: assignments[0].value,
                transmission: assignments[1].value,
                purpose: assignments[2].value,
                terrain: assignments[3].value,
            },
            assignments,
        }
    }

    /// Aggregate score of one candidate value for one axis.
    ///
    /// Returns `None` when the value is not configured for the axis.
    pub(crate) fn candidate_score(&self, axis: Axis, hits: &MarkerHits, value: &str) -> Option<f64> {
        self.config
            .axis_rules(axis)
            .candidates
            .iter()
            .find(|candidate| candidate.value == value)
            .map(|candidate| self.sum_markers(&candidate.markers, hits))
    }

    pub(crate) fn marker_hits(&self, text: &str) -> MarkerHits {
        count_marker_hits(&self.config, text)
    }

    fn sum_markers(&self, markers: &[String], hits: &MarkerHits) -> f64 {
        markers
            .iter()
            .map(|name| {
                let weight = self
                    .config
                    .marker(name)
                    .map(|marker| marker.weight)
                    .unwrap_or(0.0);
                hits.count(name) as f64 * weight
            })
            .sum()
    }

    fn score_axis(&self, axis: Axis, hits: &MarkerHits, path: &Path) -> AxisAssignment {
        let rules = self.config.axis_rules(axis);
        let scores: Vec<f64> = rules
            .candidates
            .iter()
            .map(|candidate| self.sum_markers(&candidate.markers, hits))
            .collect();

        let best = scores.iter().copied().fold(f64::MIN, f64::max);
        if best <= 0.0 {
            return AxisAssignment {
                axis,
                value: axis.fallback(),
                score: 0.0,
                source: AssignmentSource::FallbackDefault,
            };
        }

        let tied: Vec<usize> = scores
            .iter()
            .enumerate()
            .filter(|(_, score)| **score == best)
            .map(|(idx, _)| idx)
            .collect();

        let winner = if tied.len() == 1 {
            tied[0]
        } else if best >= self.config.multi_candidate_threshold() {
            // Exact tie between strong candidates: seeded pick keyed by the
            // document path so reruns stay reproducible.
            tied[seeded_index(path, tied.len())]
        } else {
            // Weak tie: first candidate in configured priority order.
            tied[0]
        };

        AxisAssignment {
            axis,
            value: rules.candidates[winner].value,
            score: best,
            source: AssignmentSource::Heuristic,
        }
    }
}

impl DocumentClassifier for HeuristicScorer {
    fn classify(&self, document: &Document) -> Classification {
        self.classify_document(document)
    }
}

/// Deterministic index in `0..len` derived from a document path.
fn seeded_index(path: &Path, len: usize) -> usize {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(seed) % len as u64) as usize
}
