//! Engine configuration: marker patterns, axis rules, thresholds and the
//! mapping table, loaded from YAML and validated before use.
//!
//! # Responsibility
//! - Keep every pattern, weight and consolidation rule in data, not code.
//! - Reject invalid configuration at load time instead of mid-batch.
//!
//! # Invariants
//! - All four axes are configured, with every candidate value drawn from the
//!   axis vocabulary.
//! - Mapping rule sources and targets are stored in canonical tag form.
//! - No replacement target is itself a rule source, so full-table application
//!   is idempotent.

use crate::model::coordinate::{Axis, AXES};
use crate::tags::mapping::{MappingPhase, MappingRule, MappingTable, MappingTarget};
use crate::tags::normalize::normalize_tag;
use regex::RegexBuilder;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

const DEFAULT_CONFIG_YAML: &str = include_str!("default.yaml");
const DEFAULT_MULTI_CANDIDATE_THRESHOLD: f64 = 4.0;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration load/validation error.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    NoMarkers,
    InvalidPattern { marker: String, message: String },
    InvalidWeight { marker: String },
    InvalidThreshold(f64),
    UnknownAxis(String),
    MissingAxis(&'static str),
    EmptyAxisCandidates(&'static str),
    UnknownAxisValue { axis: &'static str, value: String },
    DuplicateAxisValue { axis: &'static str, value: String },
    UnknownMarker { axis: &'static str, value: String, marker: String },
    EmptyRuleId,
    DuplicateRuleId(String),
    InvalidRulePhase { rule: String, phase: String },
    InvalidRuleSource { rule: String },
    InvalidRuleTarget { rule: String },
    RuleMapsToItself { rule: String },
    DuplicateRuleSource { phase: &'static str, source: String },
    NonIdempotentRule { rule: String, target: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config file: {err}"),
            Self::Yaml(err) => write!(f, "invalid config YAML: {err}"),
            Self::NoMarkers => write!(f, "config defines no marker categories"),
            Self::InvalidPattern { marker, message } => {
                write!(f, "marker `{marker}` has an invalid pattern: {message}")
            }
            Self::InvalidWeight { marker } => {
                write!(f, "marker `{marker}` weight must be a finite number")
            }
            Self::InvalidThreshold(value) => {
                write!(f, "multi_candidate threshold must be finite and positive, got {value}")
            }
            Self::UnknownAxis(name) => write!(f, "unknown axis `{name}` in config"),
            Self::MissingAxis(axis) => write!(f, "axis `{axis}` has no configuration"),
            Self::EmptyAxisCandidates(axis) => {
                write!(f, "axis `{axis}` has no candidate rules")
            }
            Self::UnknownAxisValue { axis, value } => {
                write!(f, "axis `{axis}` candidate `{value}` is not in the vocabulary")
            }
            Self::DuplicateAxisValue { axis, value } => {
                write!(f, "axis `{axis}` candidate `{value}` is configured twice")
            }
            Self::UnknownMarker { axis, value, marker } => write!(
                f,
                "axis `{axis}` candidate `{value}` references unknown marker `{marker}`"
            ),
            Self::EmptyRuleId => write!(f, "mapping rule id must not be empty"),
            Self::DuplicateRuleId(id) => write!(f, "mapping rule id `{id}` is duplicated"),
            Self::InvalidRulePhase { rule, phase } => {
                write!(f, "mapping rule `{rule}` has unknown phase `{phase}`")
            }
            Self::InvalidRuleSource { rule } => {
                write!(f, "mapping rule `{rule}` has a blank source tag")
            }
            Self::InvalidRuleTarget { rule } => {
                write!(f, "mapping rule `{rule}` has an unnormalizable target tag")
            }
            Self::RuleMapsToItself { rule } => {
                write!(f, "mapping rule `{rule}` maps a tag to itself")
            }
            Self::DuplicateRuleSource { phase, source } => {
                write!(f, "phase `{phase}` has two rules for source `{source}`")
            }
            Self::NonIdempotentRule { rule, target } => write!(
                f,
                "mapping rule `{rule}` target `{target}` is itself a rule source; \
                 table would not be idempotent"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Yaml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Yaml(value)
    }
}

/// One compiled marker category.
#[derive(Debug, Clone)]
pub struct MarkerCategory {
    pub name: String,
    pub regex: regex::Regex,
    pub weight: f64,
}

/// One candidate value for an axis and the markers that score it.
#[derive(Debug, Clone)]
pub struct CandidateRule {
    pub value: &'static str,
    pub markers: Vec<String>,
}

/// Ordered candidate rules for one axis; order is tie-break priority.
#[derive(Debug, Clone)]
pub struct AxisRules {
    pub candidates: Vec<CandidateRule>,
}

/// Validated engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    markers: Vec<MarkerCategory>,
    axes: BTreeMap<Axis, AxisRules>,
    multi_candidate_threshold: f64,
    mappings: MappingTable,
}

impl EngineConfig {
    /// Loads and validates configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Parses and validates configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let raw: RawConfig = serde_yaml::from_str(yaml)?;
        Self::from_raw(raw)
    }

    /// Built-in configuration mirroring the original consolidation tables.
    pub fn builtin_default() -> Self {
        Self::from_yaml_str(DEFAULT_CONFIG_YAML).expect("built-in default config is valid")
    }

    pub fn markers(&self) -> &[MarkerCategory] {
        &self.markers
    }

    pub fn marker(&self, name: &str) -> Option<&MarkerCategory> {
        self.markers.iter().find(|m| m.name == name)
    }

    pub fn axis_rules(&self, axis: Axis) -> &AxisRules {
        &self.axes[&axis]
    }

    pub fn multi_candidate_threshold(&self) -> f64 {
        self.multi_candidate_threshold
    }

    pub fn mappings(&self) -> &MappingTable {
        &self.mappings
    }

    fn from_raw(raw: RawConfig) -> ConfigResult<Self> {
        let threshold = raw
            .thresholds
            .and_then(|t| t.multi_candidate)
            .unwrap_or(DEFAULT_MULTI_CANDIDATE_THRESHOLD);
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold(threshold));
        }

        if raw.markers.is_empty() {
            return Err(ConfigError::NoMarkers);
        }
        let mut markers = Vec::with_capacity(raw.markers.len());
        for (name, marker) in raw.markers {
            if !marker.weight.is_finite() {
                return Err(ConfigError::InvalidWeight { marker: name });
            }
            let regex = RegexBuilder::new(&marker.pattern)
                .case_insensitive(true)
                .build()
                .map_err(|err| ConfigError::InvalidPattern {
                    marker: name.clone(),
                    message: err.to_string(),
                })?;
            markers.push(MarkerCategory {
                name,
                regex,
                weight: marker.weight,
            });
        }

        let mut axes = BTreeMap::new();
        for (name, raw_axis) in raw.axes {
            let axis = Axis::parse(&name).ok_or(ConfigError::UnknownAxis(name))?;
            if raw_axis.candidates.is_empty() {
                return Err(ConfigError::EmptyAxisCandidates(axis.label()));
            }
            let mut seen = BTreeSet::new();
            let mut candidates = Vec::with_capacity(raw_axis.candidates.len());
            for candidate in raw_axis.candidates {
                let value = axis.intern(&candidate.value).ok_or_else(|| {
                    ConfigError::UnknownAxisValue {
                        axis: axis.label(),
                        value: candidate.value.clone(),
                    }
                })?;
                if !seen.insert(value) {
                    return Err(ConfigError::DuplicateAxisValue {
                        axis: axis.label(),
                        value: value.to_string(),
                    });
                }
                for marker in &candidate.markers {
                    if !markers.iter().any(|m| &m.name == marker) {
                        return Err(ConfigError::UnknownMarker {
                            axis: axis.label(),
                            value: value.to_string(),
                            marker: marker.clone(),
                        });
                    }
                }
                candidates.push(CandidateRule {
                    value,
                    markers: candidate.markers,
                });
            }
            axes.insert(axis, AxisRules { candidates });
        }
        for axis in AXES {
            if !axes.contains_key(&axis) {
                return Err(ConfigError::MissingAxis(axis.label()));
            }
        }

        let mappings = validate_mappings(raw.mappings)?;

        Ok(Self {
            markers,
            axes,
            multi_candidate_threshold: threshold,
            mappings,
        })
    }
}

fn validate_mappings(raw: Vec<RawRule>) -> ConfigResult<MappingTable> {
    let mut rules = Vec::with_capacity(raw.len());
    let mut ids = BTreeSet::new();
    let mut sources_by_phase: BTreeMap<MappingPhase, BTreeSet<String>> = BTreeMap::new();

    for rule in raw {
        let id = rule.id.trim().to_string();
        if id.is_empty() {
            return Err(ConfigError::EmptyRuleId);
        }
        if !ids.insert(id.clone()) {
            return Err(ConfigError::DuplicateRuleId(id));
        }

        let phase = MappingPhase::parse(rule.phase.trim()).ok_or_else(|| {
            ConfigError::InvalidRulePhase {
                rule: id.clone(),
                phase: rule.phase.clone(),
            }
        })?;

        let source = normalize_tag(&rule.source)
            .ok_or_else(|| ConfigError::InvalidRuleSource { rule: id.clone() })?;
        if !sources_by_phase
            .entry(phase)
            .or_default()
            .insert(source.clone())
        {
            return Err(ConfigError::DuplicateRuleSource {
                phase: phase.label(),
                source,
            });
        }

        let target = if rule.target.trim().is_empty() {
            MappingTarget::Remove
        } else {
            let target = normalize_tag(&rule.target)
                .ok_or_else(|| ConfigError::InvalidRuleTarget { rule: id.clone() })?;
            if target == source {
                return Err(ConfigError::RuleMapsToItself { rule: id });
            }
            MappingTarget::Replace(target)
        };

        rules.push(MappingRule {
            id,
            phase,
            source,
            target,
        });
    }

    let all_sources: BTreeSet<&str> = rules.iter().map(|r| r.source.as_str()).collect();
    for rule in &rules {
        if let MappingTarget::Replace(target) = &rule.target {
            if all_sources.contains(target.as_str()) {
                return Err(ConfigError::NonIdempotentRule {
                    rule: rule.id.clone(),
                    target: target.clone(),
                });
            }
        }
    }

    Ok(MappingTable::from_validated(rules))
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    thresholds: Option<RawThresholds>,
    #[serde(default)]
    markers: BTreeMap<String, RawMarker>,
    #[serde(default)]
    axes: BTreeMap<String, RawAxis>,
    #[serde(default)]
    mappings: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
struct RawThresholds {
    #[serde(default)]
    multi_candidate: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawMarker {
    pattern: String,
    weight: f64,
    #[serde(default)]
    #[allow(dead_code)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAxis {
    candidates: Vec<RawCandidate>,
}

#[derive(Debug, Deserialize)]
struct RawCandidate {
    value: String,
    #[serde(default)]
    markers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    id: String,
    phase: String,
    source: String,
    #[serde(default)]
    target: String,
}
