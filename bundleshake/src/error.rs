//! Crate-wide error type for the bundler/treeshaker core.
//!
//! Mirrors the small, per-subsystem `thiserror` enums the teacher crate
//! favors (`graph::symbols::SemanticError`, `fix::RewriteError`), composed
//! here into one top-level error at the public API boundary
//! (`bundle`/`treeshake`).

use std::path::PathBuf;

use crate::fix::RewriteError;

/// Errors returned from [`crate::bundle`] and [`crate::treeshake`].
#[derive(Debug, thiserror::Error)]
pub enum BundleshakeError {
    /// A module spec could not be resolved against any search root.
    #[error("could not resolve module spec '{spec}' in any of the given resolution roots")]
    FileNotFound {
        /// The dotted spec that failed to resolve.
        spec: String,
    },

    /// A source file was corrupt or undecodable.
    #[error("failed to parse '{path}': {reason}")]
    ParseError {
        /// The file that failed to parse.
        path: PathBuf,
        /// Human-readable reason.
        reason: String,
    },

    /// The destination directory could not be written to.
    #[error("I/O error writing to destination: {0}")]
    Io(#[from] std::io::Error),

    /// A caller-supplied parameter conflicts with the corpus being bundled.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The byte-range rewriter rejected a set of edits (overlap/out-of-bounds).
    #[error("rewrite failed: {0}")]
    Rewrite(#[from] RewriteError),
}

impl BundleshakeError {
    /// Construct a [`BundleshakeError::ParseError`] from a ruff parse failure.
    #[must_use]
    pub fn parse_error(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::ParseError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BundleshakeError>;
