//! Error types for stencil-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading from a resource tree.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No resource exists at the requested path.
    #[error("resource not found: {path}")]
    NotFound { path: String },

    /// The path is absolute or escapes the tree root.
    #[error("invalid resource path: {path}")]
    InvalidPath { path: String },

    /// Underlying filesystem failure, with the offending path.
    #[error("resource I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled before the read happened.
    #[error("resource read cancelled")]
    Cancelled,
}

impl SourceError {
    /// True when the error only means the resource is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound { .. })
    }
}

/// Errors raised while loading a run-options file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read run options at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error, with the file path when one is known.
    #[error("failed to parse run options at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SourceError {
    SourceError::Io {
        path: path.into(),
        source,
    }
}
