use std::collections::BTreeSet;
use tessera_core::tags::mapping::apply_mappings;
use tessera_core::{normalize_tags, EngineConfig, MappingPhase, MappingTarget};

const SCENARIO_CONFIG: &str = r#"
markers:
  recovery:
    pattern: '\b(recovery|sponsor)\b'
    weight: 2.5
axes:
  structure:
    candidates:
      - value: archetype
  transmission:
    candidates:
      - value: text
  purpose:
    candidates:
      - value: help-addict
        markers: [recovery]
  terrain:
    candidates:
      - value: obvious
mappings:
  - id: flatten-flatline
    phase: format-standardization
    source: flatline-codex/flatline
    target: flatline
  - id: remove-protocol
    phase: coordinate-redundant
    source: protocol
    target: ""
"#;

fn tag_set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn hash_path_and_removal_scenario_consolidates_to_single_tag() {
    let config = EngineConfig::from_yaml_str(SCENARIO_CONFIG).unwrap();
    let raw = tag_set(&["#flatline", "flatline-codex/flatline", "protocol"]);

    let normalized = normalize_tags(&raw);
    let outcome = apply_mappings(&normalized, config.mappings());

    assert_eq!(outcome.tags, tag_set(&["flatline"]));
    assert_eq!(outcome.changes.len(), 2);

    let removal = outcome
        .changes
        .iter()
        .find(|change| change.after.is_none())
        .expect("one removal record");
    assert_eq!(removal.rule_id, "remove-protocol");
    assert_eq!(removal.phase, MappingPhase::CoordinateRedundant);
    assert_eq!(removal.before, "protocol");

    let substitution = outcome
        .changes
        .iter()
        .find(|change| change.after.is_some())
        .expect("one substitution record");
    assert_eq!(substitution.rule_id, "flatten-flatline");
    assert_eq!(substitution.before, "flatline-codex-flatline");
    assert_eq!(substitution.after.as_deref(), Some("flatline"));
}

#[test]
fn applying_default_table_twice_changes_nothing_further() {
    let config = EngineConfig::builtin_default();
    let raw = tag_set(&[
        "#protocol",
        "ritual",
        "thread-dump",
        "colors/0A0A23",
        "flatline-codex/flatline",
        "mayo-clinic",
        "B9F5D8",
    ]);

    let normalized = normalize_tags(&raw);
    let once = apply_mappings(&normalized, config.mappings());
    let twice = apply_mappings(&once.tags, config.mappings());

    assert_eq!(once.tags, twice.tags);
    assert!(twice.changes.is_empty());
}

#[test]
fn default_table_removes_coordinate_redundant_and_standardizes_formats() {
    let config = EngineConfig::builtin_default();
    let raw = tag_set(&["protocol", "narrative", "thread-dump", "_import", "sponsor"]);

    let normalized = normalize_tags(&raw);
    let outcome = apply_mappings(&normalized, config.mappings());

    assert_eq!(
        outcome.tags,
        tag_set(&["threaddump", "import", "sponsor"])
    );

    let phase_one: Vec<_> = outcome
        .changes
        .iter()
        .filter(|c| c.phase == MappingPhase::CoordinateRedundant)
        .collect();
    assert_eq!(phase_one.len(), 2);
    assert!(phase_one.iter().all(|c| c.after.is_none()));

    let phase_two: Vec<_> = outcome
        .changes
        .iter()
        .filter(|c| c.phase == MappingPhase::FormatStandardization)
        .collect();
    assert_eq!(phase_two.len(), 2);
    assert!(phase_two.iter().all(|c| c.after.is_some()));
}

#[test]
fn default_table_rules_are_canonical_and_well_formed() {
    let config = EngineConfig::builtin_default();
    for rule in config.mappings().rules() {
        assert_eq!(
            tessera_core::normalize_tag(&rule.source).as_deref(),
            Some(rule.source.as_str()),
            "rule `{}` source is not canonical",
            rule.id
        );
        if let MappingTarget::Replace(target) = &rule.target {
            assert_eq!(
                tessera_core::normalize_tag(target).as_deref(),
                Some(target.as_str()),
                "rule `{}` target is not canonical",
                rule.id
            );
        }
    }
}
