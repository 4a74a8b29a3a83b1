//! Error types for stencil-emit.

use std::path::PathBuf;

use thiserror::Error;

use stencil_core::SourceError;
use stencil_renderer::RenderError;

/// Error type target hooks report through.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Run-fatal errors. A run that returns one of these has written nothing.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown template {name:?}")]
    UnknownTemplate { name: String },

    /// The function environment (baseline, target set or script) failed.
    #[error("unable to build template funcs: {0}")]
    Funcs(#[source] RenderError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("{path} is a directory: cannot emit template")]
    IsDirectory { path: PathBuf },

    #[error("unable to read resource {path}: {source}")]
    Resource {
        path: String,
        #[source]
        source: SourceError,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The target's generation logic failed for a reason of its own.
    #[error("{target} generation failed: {source}")]
    Generate {
        target: String,
        #[source]
        source: BoxError,
    },

    #[error("run cancelled")]
    Cancelled,
}

impl EngineError {
    /// Wrap an arbitrary failure raised by `target`'s generation logic.
    pub fn generate(target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        EngineError::Generate {
            target: target.into(),
            source: source.into(),
        }
    }
}

/// Per-file errors, collected on the file's buffer instead of aborting the run.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("post failed {file}: {source}")]
    PostFailed {
        file: String,
        #[source]
        source: BoxError,
    },

    #[error("unable to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`EngineError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> EngineError {
    EngineError::Io {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn post_failed_names_file_and_unwraps_to_cause() {
        let err = FileError::PostFailed {
            file: "models.go".into(),
            source: "gofmt: unexpected EOF".into(),
        };
        assert_eq!(err.to_string(), "post failed models.go: gofmt: unexpected EOF");
        let cause = err.source().expect("cause");
        assert_eq!(cause.to_string(), "gofmt: unexpected EOF");
    }

    #[test]
    fn unknown_template_quotes_name() {
        let err = EngineError::UnknownTemplate { name: "nope".into() };
        assert_eq!(err.to_string(), "unknown template \"nope\"");
    }
}
