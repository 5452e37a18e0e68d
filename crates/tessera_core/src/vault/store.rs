//! Vault directory access: enumeration, loading, atomic writes.
//!
//! # Responsibility
//! - Enumerate markdown files in deterministic order.
//! - Load documents and write updated frontmatter back safely.
//!
//! # Invariants
//! - Enumeration order is sorted by relative path, so reruns visit files in
//!   the same order.
//! - Dot-prefixed directories (tool state, trash, old backup dirs) are never
//!   scanned.
//! - Writes are temp-file-then-rename within the target directory.

use crate::model::document::Document;
use crate::vault::frontmatter;
use crate::vault::{VaultError, VaultResult};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Filesystem access to one vault, rooted at construction time.
#[derive(Debug, Clone)]
pub struct VaultStore {
    root: PathBuf,
}

impl VaultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists vault-relative paths of all markdown files, sorted.
    pub fn list_markdown(&self) -> VaultResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        let walker = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

        for entry in walker {
            let entry = entry.map_err(|err| VaultError::Io {
                path: err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.root.clone()),
                source: err.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|ext| ext.to_str()) != Some("md") {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                paths.push(relative.to_path_buf());
            }
        }

        paths.sort();
        Ok(paths)
    }

    /// Loads one document by vault-relative path.
    pub fn load(&self, relative: &Path) -> VaultResult<Document> {
        let absolute = self.root.join(relative);
        let content = fs::read_to_string(&absolute).map_err(|err| VaultError::Io {
            path: relative.to_path_buf(),
            source: err,
        })?;

        let (frontmatter, body_offset) =
            frontmatter::parse(&content).map_err(|message| VaultError::Parse {
                path: relative.to_path_buf(),
                message,
            })?;

        Ok(Document {
            path: relative.to_path_buf(),
            frontmatter,
            body: content[body_offset..].to_string(),
        })
    }

    /// Writes one document back, atomically.
    ///
    /// The rendered frontmatter block (when present) is followed by the
    /// byte-preserved body.
    pub fn write(&self, document: &Document) -> VaultResult<()> {
        let absolute = self.root.join(&document.path);
        let mut content = String::new();
        if let Some(fm) = &document.frontmatter {
            content.push_str(&frontmatter::render(fm));
        }
        content.push_str(&document.body);

        let temp = temp_path(&absolute);
        fs::write(&temp, &content).map_err(|err| VaultError::Io {
            path: document.path.clone(),
            source: err,
        })?;
        fs::rename(&temp, &absolute).map_err(|err| {
            let _ = fs::remove_file(&temp);
            VaultError::Io {
                path: document.path.clone(),
                source: err,
            }
        })
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|name| name.starts_with('.'))
}

fn temp_path(target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("document.md");
    target.with_file_name(format!(".{file_name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::VaultStore;
    use std::fs;
    use std::path::Path;

    fn fixture_vault() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("temp vault");
        fs::create_dir_all(dir.path().join("recovery")).unwrap();
        fs::create_dir_all(dir.path().join(".trash")).unwrap();
        fs::write(
            dir.path().join("root-note.md"),
            "---\ntags:\n  - codex\n---\nroot body\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("recovery/meeting.md"),
            "---\ntags:\n  - recovery\n---\nmeeting body\n",
        )
        .unwrap();
        fs::write(dir.path().join("recovery/plain.txt"), "not markdown").unwrap();
        fs::write(dir.path().join(".trash/old.md"), "trashed").unwrap();
        dir
    }

    #[test]
    fn lists_markdown_sorted_and_skips_hidden_dirs() {
        let vault = fixture_vault();
        let store = VaultStore::new(vault.path());
        let listed = store.list_markdown().unwrap();
        assert_eq!(
            listed,
            vec![
                Path::new("recovery/meeting.md").to_path_buf(),
                Path::new("root-note.md").to_path_buf(),
            ]
        );
    }

    #[test]
    fn load_preserves_body_exactly() {
        let vault = fixture_vault();
        let store = VaultStore::new(vault.path());
        let doc = store.load(Path::new("root-note.md")).unwrap();
        assert_eq!(doc.body, "root body\n");
        assert!(doc.frontmatter.unwrap().tags.contains("codex"));
    }

    #[test]
    fn write_replaces_frontmatter_and_keeps_body() {
        let vault = fixture_vault();
        let store = VaultStore::new(vault.path());
        let mut doc = store.load(Path::new("root-note.md")).unwrap();
        let fm = doc.frontmatter.as_mut().unwrap();
        fm.tags.clear();
        fm.tags.insert("flatline".to_string());

        store.write(&doc).unwrap();

        let raw = fs::read_to_string(vault.path().join("root-note.md")).unwrap();
        assert!(raw.contains("tags:\n  - flatline\n"));
        assert!(raw.ends_with("root body\n"));
        // No temp file left behind.
        assert!(!vault.path().join(".root-note.md.tmp").exists());
    }
}
