//! Error types for stencil-renderer.

use thiserror::Error;

use stencil_core::SourceError;

/// Failures of the embedded script extension.
#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("unable to load funcs.lua: {0}")]
    Read(#[source] SourceError),

    #[error("funcs.lua is not valid UTF-8")]
    Utf8,

    /// The script failed to parse or raised while being evaluated.
    #[error("unable to eval funcs.lua: {0}")]
    Eval(#[source] mlua::Error),

    #[error("funcs.lua does not define Init")]
    MissingInit,

    #[error("Init must be `function(config) -> (table, err)`, has: {found}")]
    InitShape { found: String },

    #[error("Init returned {name:?} as a {found}, expected a function")]
    NotCallable { name: String, found: String },

    /// Init raised, or returned a non-nil error value.
    #[error("Init error: {message}")]
    Init { message: String },
}

/// All errors that can arise while building funcs or rendering a template.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unable to open template {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: SourceError,
    },

    #[error("template {path} is not valid UTF-8")]
    Utf8 { path: String },

    #[error("unable to parse template {path}: {}", describe(.source))]
    Parse {
        path: String,
        #[source]
        source: tera::Error,
    },

    #[error("unable to exec template {path}: {}", describe(.source))]
    Exec {
        path: String,
        #[source]
        source: tera::Error,
    },

    /// Building the tera context from a descriptor failed.
    #[error("context serialization error: {0}")]
    Context(#[source] tera::Error),

    #[error(transparent)]
    Extension(#[from] ExtensionError),
}

/// Flatten a tera error and its causes into one line; tera keeps the useful
/// detail (undefined variable, unknown filter) in the source chain.
pub(crate) fn describe(err: &tera::Error) -> String {
    let mut msg = err.to_string();
    let mut cause = std::error::Error::source(err);
    while let Some(inner) = cause {
        msg.push_str(": ");
        msg.push_str(&inner.to_string());
        cause = inner.source();
    }
    msg
}
