//! Canonical tag form.
//!
//! # Responsibility
//! - Collapse the observed tag spellings (`#hash`, `path/like`, `B9F5D8`)
//!   into one lowercase canonical token.
//!
//! # Invariants
//! - `normalize_tag` is a fixed point: normalizing a canonical tag returns it
//!   unchanged.
//! - Path separators never survive normalization; segments are hyphen-joined.
//!   Flattening a path tag to its last segment is a mapping-table decision,
//!   not an automatic one.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Fa-f]{6}$").expect("valid hex color regex"));

/// Normalizes one raw tag to canonical form.
///
/// Returns `None` for blank input. Steps, in order:
/// 1. trim whitespace;
/// 2. strip a single leading `#`;
/// 3. a bare 6-digit hex code becomes `color-<lowerhex>`;
/// 4. `/` separators are replaced with `-` (path segments hyphen-joined);
/// 5. lowercase.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if stripped.is_empty() {
        return None;
    }

    if HEX_COLOR_RE.is_match(stripped) {
        return Some(format!("color-{}", stripped.to_lowercase()));
    }

    let joined = stripped
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if joined.is_empty() {
        return None;
    }

    Some(joined.to_lowercase())
}

/// Normalizes and deduplicates a raw tag list into a canonical set.
pub fn normalize_tags<I, S>(raw: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|tag| normalize_tag(tag.as_ref()))
        .collect()
}
