//! Document and frontmatter records.
//!
//! # Responsibility
//! - Represent one markdown note: vault-relative path, frontmatter, body.
//! - Keep unknown frontmatter keys intact across a rewrite.
//!
//! # Invariants
//! - `Frontmatter::tags` is deduplicated; callers insert canonical forms only.
//! - `body` is the exact text following the closing frontmatter delimiter and
//!   is never modified by the tag engine.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Parsed YAML frontmatter with tags/aliases split out from passthrough keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    /// Display aliases, order preserved.
    pub aliases: Vec<String>,
    /// Tag set, deduplicated; serialized sorted.
    pub tags: BTreeSet<String>,
    /// All other keys, preserved verbatim and serialized in key order.
    pub extra: BTreeMap<String, Value>,
}

impl Frontmatter {
    /// True when nothing would serialize beyond empty tag/alias lists.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty() && self.tags.is_empty() && self.extra.is_empty()
    }
}

/// One markdown note loaded from the vault.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Vault-relative path.
    pub path: PathBuf,
    /// `None` when the file has no frontmatter block.
    pub frontmatter: Option<Frontmatter>,
    /// Body text after the frontmatter block (or the whole file without one).
    pub body: String,
}

impl Document {
    /// Current tag set, empty when there is no frontmatter.
    pub fn tags(&self) -> BTreeSet<String> {
        self.frontmatter
            .as_ref()
            .map(|fm| fm.tags.clone())
            .unwrap_or_default()
    }

    /// Text used for classification scoring: body plus tag tokens.
    pub fn classification_text(&self) -> String {
        let mut text = self.body.clone();
        if let Some(fm) = &self.frontmatter {
            for tag in &fm.tags {
                text.push('\n');
                text.push_str(tag);
            }
        }
        text
    }
}
