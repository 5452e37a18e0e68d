//! Tesseract coordinate axes and their fixed vocabularies.
//!
//! # Responsibility
//! - Define the four classification axes and the allowed value set per axis.
//! - Provide stable string mappings for persistence and config validation.
//!
//! # Invariants
//! - Vocabulary order doubles as the documented tie-break priority order.
//! - String labels are the single wire/storage form; parsing rejects anything
//!   outside the vocabulary.

use serde::{Deserialize, Serialize};

/// One of the four independent classification dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Structure,
    Transmission,
    Purpose,
    Terrain,
}

/// All axes in canonical order.
pub const AXES: [Axis; 4] = [
    Axis::Structure,
    Axis::Transmission,
    Axis::Purpose,
    Axis::Terrain,
];

const STRUCTURE_VALUES: &[&str] = &[
    "archetype",
    "protocol",
    "shadowcast",
    "expansion",
    "summoning",
];
const TRANSMISSION_VALUES: &[&str] = &["narrative", "text", "image", "tarot", "invocation"];
const PURPOSE_VALUES: &[&str] = &[
    "tell-story",
    "help-addict",
    "prevent-death-poverty",
    "financial-amends",
    "help-world",
];
const TERRAIN_VALUES: &[&str] = &["obvious", "complicated", "complex", "chaotic", "confused"];

impl Axis {
    /// Lowercase axis label used in config files, logs and storage.
    pub fn label(self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Transmission => "transmission",
            Self::Purpose => "purpose",
            Self::Terrain => "terrain",
        }
    }

    /// Parses an axis label.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "structure" => Some(Self::Structure),
            "transmission" => Some(Self::Transmission),
            "purpose" => Some(Self::Purpose),
            "terrain" => Some(Self::Terrain),
            _ => None,
        }
    }

    /// Fixed vocabulary for this axis, in tie-break priority order.
    pub fn vocabulary(self) -> &'static [&'static str] {
        match self {
            Self::Structure => STRUCTURE_VALUES,
            Self::Transmission => TRANSMISSION_VALUES,
            Self::Purpose => PURPOSE_VALUES,
            Self::Terrain => TERRAIN_VALUES,
        }
    }

    /// Returns the vocabulary entry equal to `value`, if any.
    ///
    /// Used to intern config-supplied and classifier-supplied labels into
    /// `'static` strings after validation.
    pub fn intern(self, value: &str) -> Option<&'static str> {
        self.vocabulary().iter().copied().find(|v| *v == value)
    }

    /// Fallback value used when no candidate scores above zero.
    ///
    /// Terrain degrades to the `confused` sentinel; the other axes keep the
    /// defaults the scoring tables assume.
    pub fn fallback(self) -> &'static str {
        match self {
            Self::Structure => "archetype",
            Self::Transmission => "text",
            Self::Purpose => "tell-story",
            Self::Terrain => "confused",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single point in 4D coordinate space: one value per axis.
///
/// Values are interned vocabulary entries; (de)serialization of records goes
/// through [`Coordinate::from_labels`] instead of serde.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coordinate {
    pub structure: &'static str,
    pub transmission: &'static str,
    pub purpose: &'static str,
    pub terrain: &'static str,
}

impl Coordinate {
    /// Builds a coordinate from axis labels, rejecting out-of-vocabulary
    /// values.
    pub fn from_labels(
        structure: &str,
        transmission: &str,
        purpose: &str,
        terrain: &str,
    ) -> Option<Self> {
        Some(Self {
            structure: Axis::Structure.intern(structure)?,
            transmission: Axis::Transmission.intern(transmission)?,
            purpose: Axis::Purpose.intern(purpose)?,
            terrain: Axis::Terrain.intern(terrain)?,
        })
    }

    /// Value for one axis.
    pub fn value(&self, axis: Axis) -> &'static str {
        match axis {
            Axis::Structure => self.structure,
            Axis::Transmission => self.transmission,
            Axis::Purpose => self.purpose,
            Axis::Terrain => self.terrain,
        }
    }

    /// Compact `structure:transmission:purpose:terrain` key.
    pub fn key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.structure, self.transmission, self.purpose, self.terrain
        )
    }
}

/// How a per-axis value was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentSource {
    /// Pattern-scoring heuristic picked the value.
    Heuristic,
    /// An external classifier supplied a validated label.
    External,
    /// No candidate scored above zero; the axis fallback was used.
    FallbackDefault,
}

/// Per-axis outcome of one classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisAssignment {
    pub axis: Axis,
    pub value: &'static str,
    pub score: f64,
    pub source: AssignmentSource,
}

/// Full classification result for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub coordinate: Coordinate,
    pub assignments: [AxisAssignment; 4],
}

impl Classification {
    /// Mean winning score across the four axes.
    pub fn confidence(&self) -> f64 {
        self.assignments.iter().map(|a| a.score).sum::<f64>() / 4.0
    }

    /// Number of axes that fell back to their default value.
    pub fn fallback_count(&self) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.source == AssignmentSource::FallbackDefault)
            .count()
    }
}

/// Persisted coordinate record for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinateRecord {
    /// Vault-relative document path.
    pub path: String,
    pub coordinate: Coordinate,
    /// Mean winning axis score at classification time.
    pub confidence: f64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::{Axis, Coordinate, AXES};

    #[test]
    fn every_axis_has_a_nonempty_vocabulary_containing_its_fallback() {
        for axis in AXES {
            assert!(!axis.vocabulary().is_empty());
            assert!(axis.vocabulary().contains(&axis.fallback()));
        }
    }

    #[test]
    fn axis_labels_round_trip() {
        for axis in AXES {
            assert_eq!(Axis::parse(axis.label()), Some(axis));
        }
        assert_eq!(Axis::parse("flavor"), None);
    }

    #[test]
    fn coordinate_rejects_out_of_vocabulary_values() {
        assert!(Coordinate::from_labels("archetype", "text", "tell-story", "obvious").is_some());
        assert!(Coordinate::from_labels("archetype", "text", "tell-story", "muddy").is_none());
    }

    #[test]
    fn coordinate_key_joins_axes_in_order() {
        let coord =
            Coordinate::from_labels("protocol", "narrative", "help-addict", "complex").unwrap();
        assert_eq!(coord.key(), "protocol:narrative:help-addict:complex");
    }
}
