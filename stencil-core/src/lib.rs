//! Stencil core library: template descriptors, run configuration, resource
//! trees and errors shared by the renderer and the emission pipeline.
//!
//! - [`types`]: [`Template`] descriptor and extra-option flags
//! - [`config`]: [`RunConfig`] and [`CancelFlag`]
//! - [`source`]: [`TemplateSource`] resource trees
//! - [`error`]: [`SourceError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod source;
pub mod types;

pub use config::{CancelFlag, RunConfig};
pub use error::{ConfigError, SourceError};
pub use source::{DirSource, StaticSource, TemplateSource};
pub use types::{FlagKind, FlagOption, FlagSet, Template};
