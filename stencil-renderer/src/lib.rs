//! # stencil-renderer
//!
//! Tera-based rendering of template descriptors, plus the function
//! environment every template is parsed against.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use stencil_core::{RunConfig, StaticSource, Template};
//! use stencil_renderer::{build_funcs, FuncMap, Renderer};
//!
//! fn render_one() -> Result<(), stencil_renderer::RenderError> {
//!     let source = Arc::new(StaticSource::new().with("table.sql.tera", "TABLE {{ name }}\n"));
//!     let config = RunConfig::new("demo");
//!     let funcs = build_funcs(FuncMap::base(), source.as_ref(), &config)?;
//!     let renderer = Renderer::new(source, funcs, ".sql");
//!     let buf = renderer.exec(&Template::new("table").with_name("posts"))?;
//!     assert_eq!(buf, b"TABLE posts\n");
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod extension;
pub mod filters;
pub mod funcs;

pub use engine::{build_funcs, LoadedTemplate, Renderer, TEMPLATE_SUFFIX};
pub use error::{ExtensionError, RenderError};
pub use extension::{load_extension, FUNCS_RESOURCE, INIT_FN};
pub use funcs::FuncMap;
