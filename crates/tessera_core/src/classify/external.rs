//! External classifier adapter with validation and heuristic fallback.
//!
//! # Responsibility
//! - Wrap an opaque per-axis label supplier behind retry + validation.
//! - Degrade a single axis, never the whole document, when the supplier
//!   misbehaves.
//!
//! # Invariants
//! - Out-of-vocabulary labels never reach a `Coordinate`.
//! - Transient failures retry a bounded number of times with backoff; a
//!   persistent failure falls back to the heuristic for that axis only.

use crate::classify::heuristic::HeuristicScorer;
use crate::classify::DocumentClassifier;
use crate::model::coordinate::{
    AssignmentSource, Axis, AxisAssignment, Classification, Coordinate, AXES,
};
use crate::model::document::Document;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(250);

/// Failure from an external label supplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestError {
    /// Worth retrying: timeouts, throttling, connection resets.
    Transient(String),
    /// Not worth retrying: auth failure, unsupported axis, bad request.
    Permanent(String),
}

impl Display for SuggestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient(message) => write!(f, "transient classifier failure: {message}"),
            Self::Permanent(message) => write!(f, "permanent classifier failure: {message}"),
        }
    }
}

impl Error for SuggestError {}

/// Opaque per-axis classifier: one label per axis per document text.
///
/// Implementations wrap whatever service actually produces labels; tests use
/// deterministic fakes. Selected by injection, never by global state.
pub trait AxisSuggester {
    fn suggest(&self, axis: Axis, text: &str) -> Result<String, SuggestError>;
}

/// Validating wrapper around an [`AxisSuggester`].
///
/// Every suggested label is checked against the axis vocabulary; rejected or
/// failed axes keep the heuristic assignment.
pub struct ValidatedClassifier<S: AxisSuggester> {
    suggester: S,
    heuristic: HeuristicScorer,
    max_attempts: u32,
    backoff: Duration,
}

impl<S: AxisSuggester> ValidatedClassifier<S> {
    pub fn new(suggester: S, heuristic: HeuristicScorer) -> Self {
        Self {
            suggester,
            heuristic,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Overrides retry policy. Zero attempts is clamped to one.
    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    fn suggest_with_retry(&self, axis: Axis, text: &str) -> Result<String, SuggestError> {
        let mut last = SuggestError::Transient("no attempts made".to_string());
        for attempt in 1..=self.max_attempts {
            match self.suggester.suggest(axis, text) {
                Ok(label) => return Ok(label),
                Err(SuggestError::Permanent(message)) => {
                    return Err(SuggestError::Permanent(message));
                }
                Err(err @ SuggestError::Transient(_)) => {
                    last = err;
                    if attempt < self.max_attempts {
                        std::thread::sleep(self.backoff * attempt);
                    }
                }
            }
        }
        Err(last)
    }
}

impl<S: AxisSuggester> DocumentClassifier for ValidatedClassifier<S> {
    fn classify(&self, document: &Document) -> Classification {
        let base = self.heuristic.classify_document(document);
        let text = document.classification_text();
        let hits = self.heuristic.marker_hits(&text);

        let mut assignments = base.assignments;
        for (idx, axis) in AXES.into_iter().enumerate() {
            match self.suggest_with_retry(axis, &text) {
                Ok(label) => match axis.intern(label.trim()) {
                    Some(value) => {
                        let score = self
                            .heuristic
                            .candidate_score(axis, &hits, value)
                            .unwrap_or(0.0);
                        assignments[idx] = AxisAssignment {
                            axis,
                            value,
                            score,
                            source: AssignmentSource::External,
                        };
                    }
                    None => {
                        warn!(
                            "event=classify_axis module=classify status=rejected axis={} path={} label={}",
                            axis,
                            document.path.display(),
                            label
                        );
                    }
                },
                Err(err) => {
                    warn!(
                        "event=classify_axis module=classify status=fallback axis={} path={} error={}",
                        axis,
                        document.path.display(),
                        err
                    );
                }
            }
        }

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
}

#[cfg(test)]
mod tests {
    use super::{AxisSuggester, SuggestError, ValidatedClassifier};
    use crate::classify::{DocumentClassifier, HeuristicScorer};
    use crate::config::EngineConfig;
    use crate::model::coordinate::{AssignmentSource, Axis};
    use crate::model::document::Document;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    fn heuristic() -> HeuristicScorer {
        HeuristicScorer::new(Arc::new(EngineConfig::builtin_default()))
    }

    fn doc(body: &str) -> Document {
        Document {
            path: PathBuf::from("note.md"),
            frontmatter: None,
            body: body.to_string(),
        }
    }

    struct FixedSuggester(&'static str);

    impl AxisSuggester for FixedSuggester {
        fn suggest(&self, _axis: Axis, _text: &str) -> Result<String, SuggestError> {
            Ok(self.0.to_string())
        }
    }

    struct FlakySuggester {
        failures_before_success: RefCell<u32>,
    }

    impl AxisSuggester for FlakySuggester {
        fn suggest(&self, _axis: Axis, _text: &str) -> Result<String, SuggestError> {
            let mut remaining = self.failures_before_success.borrow_mut();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SuggestError::Transient("timeout".to_string()));
            }
            Ok("narrative".to_string())
        }
    }

    struct AlwaysDown;

    impl AxisSuggester for AlwaysDown {
        fn suggest(&self, _axis: Axis, _text: &str) -> Result<String, SuggestError> {
            Err(SuggestError::Transient("connection refused".to_string()))
        }
    }

    #[test]
    fn out_of_vocabulary_label_falls_back_per_axis() {
        // `narrative` is valid for transmission only; every other axis must
        // keep its heuristic assignment.
        let classifier = ValidatedClassifier::new(FixedSuggester("narrative"), heuristic())
            .with_retry(1, Duration::ZERO);
        let classification = classifier.classify(&doc("sponsor meeting recovery sobriety"));

        assert_eq!(classification.coordinate.transmission, "narrative");
        assert_eq!(
            classification.assignments[1].source,
            AssignmentSource::External
        );
        assert_eq!(classification.coordinate.purpose, "help-addict");
        assert_ne!(
            classification.assignments[2].source,
            AssignmentSource::External
        );
    }

    #[test]
    fn transient_failures_retry_then_succeed() {
        let classifier = ValidatedClassifier::new(
            FlakySuggester {
                failures_before_success: RefCell::new(1),
            },
            heuristic(),
        )
        .with_retry(3, Duration::ZERO);
        let classification = classifier.classify(&doc("plain text"));
        assert_eq!(classification.coordinate.transmission, "narrative");
    }

    #[test]
    fn persistent_failure_degrades_to_heuristic() {
        let classifier =
            ValidatedClassifier::new(AlwaysDown, heuristic()).with_retry(2, Duration::ZERO);
        let with_fallback = classifier.classify(&doc("sponsor meeting recovery sobriety"));
        let heuristic_only = heuristic().classify(&doc("sponsor meeting recovery sobriety"));
        assert_eq!(with_fallback.coordinate, heuristic_only.coordinate);
    }

    #[test]
    fn output_always_has_one_value_per_axis() {
        let classifier = ValidatedClassifier::new(FixedSuggester("not-a-real-label"), heuristic())
            .with_retry(1, Duration::ZERO);
        let classification = classifier.classify(&doc(""));
        assert_eq!(classification.assignments.len(), 4);
        for (assignment, axis) in classification
            .assignments
            .iter()
            .zip(crate::model::coordinate::AXES)
        {
            assert!(axis.vocabulary().contains(&assignment.value));
        }
    }
}
