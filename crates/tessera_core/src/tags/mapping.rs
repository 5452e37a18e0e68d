//! Phased mapping-table application over a document's tag set.
//!
//! # Responsibility
//! - Apply coordinate-redundant removals, then format standardization.
//! - Produce one `ChangeRecord` per removal or substitution.
//!
//! # Invariants
//! - A tag removed in the first phase is never reconsidered in the second.
//! - Replacing a tag with one already present is a silent merge (set
//!   semantics), still recorded as a change.
//! - Table loading guarantees no replacement target is itself a rule source,
//!   which makes full-table application idempotent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Ordered rule phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MappingPhase {
    /// Tags fully subsumed by a coordinate axis value.
    CoordinateRedundant,
    /// Spelling/format consolidation and artifact removal.
    FormatStandardization,
}

impl MappingPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::CoordinateRedundant => "coordinate-redundant",
            Self::FormatStandardization => "format-standardization",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "coordinate-redundant" => Some(Self::CoordinateRedundant),
            "format-standardization" => Some(Self::FormatStandardization),
            _ => None,
        }
    }
}

/// Rule outcome: replace with another tag, or drop entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingTarget {
    Replace(String),
    Remove,
}

/// One declarative consolidation rule. `source` is canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    pub id: String,
    pub phase: MappingPhase,
    pub source: String,
    pub target: MappingTarget,
}

/// Validated, phase-ordered rule table.
///
/// Construction happens in the config loader, which canonicalizes sources and
/// targets and rejects non-idempotent tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingTable {
    rules: Vec<MappingRule>,
}

impl MappingTable {
    /// Wraps already-validated rules. Callers go through the config loader.
    pub(crate) fn from_validated(rules: Vec<MappingRule>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    fn find(&self, phase: MappingPhase, tag: &str) -> Option<&MappingRule> {
        self.rules
            .iter()
            .find(|rule| rule.phase == phase && rule.source == tag)
    }
}

/// One applied removal or substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub rule_id: String,
    pub phase: MappingPhase,
    pub before: String,
    /// `None` for removals.
    pub after: Option<String>,
}

/// Result of applying the full table to one tag set.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingOutcome {
    pub tags: BTreeSet<String>,
    pub changes: Vec<ChangeRecord>,
}

impl MappingOutcome {
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Applies both rule phases, in order, to a canonical tag set.
pub fn apply_mappings(tags: &BTreeSet<String>, table: &MappingTable) -> MappingOutcome {
    let mut current: BTreeSet<String> = tags.clone();
    let mut changes = Vec::new();

    for phase in [
        MappingPhase::CoordinateRedundant,
        MappingPhase::FormatStandardization,
    ] {
        let mut next = BTreeSet::new();
        for tag in current {
            match table.find(phase, &tag) {
                Some(rule) => match &rule.target {
                    MappingTarget::Remove => {
                        changes.push(ChangeRecord {
                            rule_id: rule.id.clone(),
                            phase,
                            before: tag,
                            after: None,
                        });
                    }
                    MappingTarget::Replace(target) => {
                        changes.push(ChangeRecord {
                            rule_id: rule.id.clone(),
                            phase,
                            before: tag,
                            after: Some(target.clone()),
                        });
                        next.insert(target.clone());
                    }
                },
                None => {
                    next.insert(tag);
                }
            }
        }
        current = next;
    }

    MappingOutcome {
        tags: current,
        changes,
    }
}
