//! Vault I/O: frontmatter parsing/emission and corpus file access.
//!
//! # Responsibility
//! - Load markdown documents from a vault directory tree.
//! - Write updated frontmatter back atomically, byte-preserving bodies.
//!
//! # Invariants
//! - A malformed frontmatter block is a recoverable per-document error, never
//!   a batch abort.
//! - Every write goes through temp-file-then-rename; a partial batch never
//!   leaves a half-written file.

pub mod frontmatter;
pub mod store;

pub use store::VaultStore;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type VaultResult<T> = Result<T, VaultError>;

/// Vault access error.
#[derive(Debug)]
pub enum VaultError {
    /// Filesystem failure reading or writing one path.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Malformed frontmatter; the document is skipped and flagged.
    Parse { path: PathBuf, message: String },
}

impl VaultError {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Io { path, .. } => path,
            Self::Parse { path, .. } => path,
        }
    }
}

impl Display for VaultError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "vault io failure at `{}`: {source}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "malformed frontmatter in `{}`: {message}", path.display())
            }
        }
    }
}

impl Error for VaultError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { .. } => None,
        }
    }
}
