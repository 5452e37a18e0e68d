//! Frontmatter block parsing and Obsidian-compatible emission.
//!
//! # Responsibility
//! - Split a markdown file into frontmatter and an untouched body.
//! - Re-emit frontmatter with `tags`/`aliases` as multi-line block lists, the
//!   layout the downstream note tool requires.
//!
//! # Invariants
//! - `aliases` and `tags` always serialize one item per line, never inline;
//!   empty lists serialize as `[]`.
//! - Passthrough keys survive a rewrite with their values intact, in sorted
//!   key order.

use crate::model::document::Frontmatter;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Splits file content into an optional frontmatter block and the body.
///
/// Returns the parsed frontmatter and the byte offset where the body starts
/// (directly after the closing delimiter line). Content without an opening
/// `---` line parses as `(None, 0)`.
///
/// # Errors
/// Returns a message for an unterminated block or YAML that is not a mapping.
pub fn parse(content: &str) -> Result<(Option<Frontmatter>, usize), String> {
    let stripped = content.strip_prefix('\u{feff}').unwrap_or(content);
    let bom_len = content.len() - stripped.len();

    let mut lines = stripped.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Ok((None, 0));
    };
    if first.trim_end() != "---" {
        return Ok((None, 0));
    }

    let mut offset = bom_len + first.len();
    let yaml_start = offset;
    let mut yaml_end: Option<usize> = None;

    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            yaml_end = Some(offset);
            offset += line.len();
            break;
        }
        offset += line.len();
    }

    let Some(yaml_end) = yaml_end else {
        return Err("unterminated frontmatter block".to_string());
    };

    let raw_yaml = &content[yaml_start..yaml_end];
    let frontmatter = parse_yaml_block(raw_yaml)?;
    Ok((Some(frontmatter), offset))
}

fn parse_yaml_block(raw_yaml: &str) -> Result<Frontmatter, String> {
    let yaml_value: serde_yaml::Value =
        serde_yaml::from_str(raw_yaml).map_err(|err| err.to_string())?;
    if matches!(yaml_value, serde_yaml::Value::Null) {
        return Ok(Frontmatter::default());
    }

    let json_value: Value = serde_json::to_value(yaml_value).map_err(|err| err.to_string())?;
    let Value::Object(map) = json_value else {
        return Err("frontmatter is not a key/value mapping".to_string());
    };

    let mut frontmatter = Frontmatter::default();
    for (key, value) in map {
        match key.as_str() {
            "tags" => frontmatter.tags = value_to_tag_set(value),
            "aliases" => frontmatter.aliases = value_to_string_list(value),
            _ => {
                frontmatter.extra.insert(key, value);
            }
        }
    }
    Ok(frontmatter)
}

/// Tags may appear as a list, a single scalar, or numbers; nulls are dropped.
fn value_to_tag_set(value: Value) -> BTreeSet<String> {
    match value {
        Value::Array(items) => items.into_iter().filter_map(scalar_to_string).collect(),
        other => scalar_to_string(other).into_iter().collect(),
    }
}

fn value_to_string_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.into_iter().filter_map(scalar_to_string).collect(),
        other => scalar_to_string(other).into_iter().collect(),
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Renders a full frontmatter block, including both `---` delimiter lines.
///
/// Layout follows the downstream tool's property-panel requirements: aliases
/// first (quoted), then tags (sorted, unquoted), then passthrough keys in
/// sorted order.
pub fn render(frontmatter: &Frontmatter) -> String {
    let mut out = String::from("---\n");

    if frontmatter.aliases.is_empty() {
        out.push_str("aliases: []\n");
    } else {
        out.push_str("aliases:\n");
        for alias in &frontmatter.aliases {
            out.push_str("  - \"");
            out.push_str(&alias.replace('\\', "\\\\").replace('"', "\\\""));
            out.push_str("\"\n");
        }
    }

    if frontmatter.tags.is_empty() {
        out.push_str("tags: []\n");
    } else {
        out.push_str("tags:\n");
        for tag in &frontmatter.tags {
            out.push_str("  - ");
            out.push_str(tag);
            out.push('\n');
        }
    }

    for (key, value) in &frontmatter.extra {
        match serde_yaml::to_string(&BTreeMap::from([(key.as_str(), value)])) {
            Ok(rendered) => out.push_str(&rendered),
            Err(err) => {
                log::error!(
                    "event=frontmatter_render module=vault status=error key={key} error={err}"
                );
            }
        }
    }

    out.push_str("---\n");
    out
}

#[cfg(test)]
mod tests {
    use super::{parse, render};
    use crate::model::document::Frontmatter;
    use serde_json::json;

    #[test]
    fn parses_tags_and_aliases_and_body_offset() {
        let content = "---\ntags:\n  - flatline\n  - protocol\naliases:\n  - \"Old Name\"\ndate: 2025-09-13\n---\n# Title\nBody text\n";
        let (frontmatter, offset) = parse(content).unwrap();
        let fm = frontmatter.unwrap();
        assert!(fm.tags.contains("flatline"));
        assert!(fm.tags.contains("protocol"));
        assert_eq!(fm.aliases, vec!["Old Name".to_string()]);
        assert_eq!(fm.extra.get("date"), Some(&json!("2025-09-13")));
        assert_eq!(&content[offset..], "# Title\nBody text\n");
    }

    #[test]
    fn no_frontmatter_returns_zero_offset() {
        let content = "# Just a note\nNo metadata here.\n";
        let (frontmatter, offset) = parse(content).unwrap();
        assert!(frontmatter.is_none());
        assert_eq!(offset, 0);
    }

    #[test]
    fn scalar_and_numeric_tags_are_accepted() {
        let content = "---\ntags: solo\n---\nbody";
        let (fm, _) = parse(content).unwrap();
        assert!(fm.unwrap().tags.contains("solo"));

        let content = "---\ntags:\n  - 111\n  - real-tag\n---\n";
        let (fm, _) = parse(content).unwrap();
        let fm = fm.unwrap();
        assert!(fm.tags.contains("111"));
        assert!(fm.tags.contains("real-tag"));
    }

    #[test]
    fn unterminated_block_is_a_parse_error() {
        let err = parse("---\ntags:\n  - dangling\n").unwrap_err();
        assert!(err.contains("unterminated"));
    }

    #[test]
    fn non_mapping_frontmatter_is_a_parse_error() {
        let err = parse("---\n- just\n- a\n- list\n---\n").unwrap_err();
        assert!(err.contains("mapping"));
    }

    #[test]
    fn bom_prefixed_content_parses() {
        let content = "\u{feff}---\ntags:\n  - codex\n---\nbody";
        let (fm, offset) = parse(content).unwrap();
        assert!(fm.unwrap().tags.contains("codex"));
        assert_eq!(&content[offset..], "body");
    }

    #[test]
    fn render_emits_block_lists_never_inline() {
        let mut fm = Frontmatter::default();
        fm.tags.insert("flatline".to_string());
        fm.tags.insert("color-b9f5d8".to_string());
        fm.aliases.push("Display Name".to_string());
        fm.extra.insert("date".to_string(), json!("2025-09-13"));

        let rendered = render(&fm);
        assert!(rendered.starts_with("---\n"));
        assert!(rendered.ends_with("---\n"));
        assert!(rendered.contains("aliases:\n  - \"Display Name\"\n"));
        assert!(rendered.contains("tags:\n  - color-b9f5d8\n  - flatline\n"));
        assert!(rendered.contains("date: 2025-09-13\n"));
        assert!(!rendered.contains("tags: ["));
    }

    #[test]
    fn render_uses_empty_markers_for_missing_lists() {
        let rendered = render(&Frontmatter::default());
        assert!(rendered.contains("aliases: []\n"));
        assert!(rendered.contains("tags: []\n"));
    }

    #[test]
    fn render_then_parse_round_trips_tag_set() {
        let mut fm = Frontmatter::default();
        fm.tags.insert("one".to_string());
        fm.tags.insert("two".to_string());
        fm.extra.insert("weight".to_string(), json!(3));

        let content = format!("{}body\n", render(&fm));
        let (parsed, _) = parse(&content).unwrap();
        let parsed = parsed.unwrap();
        assert_eq!(parsed.tags, fm.tags);
        assert_eq!(parsed.extra.get("weight"), Some(&json!(3)));
    }
}
