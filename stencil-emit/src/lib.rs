//! # stencil-emit
//!
//! Target registry, emission pipeline and output writer.
//!
//! Build a [`Registry`], hand it a [`RunConfig`](stencil_core::RunConfig)
//! and a data model via [`process`], then persist the result with
//! [`Emission::write`]:
//!
//! ```rust,no_run
//! use serde_json::json;
//! use stencil_core::RunConfig;
//! use stencil_emit::{process, Registry};
//!
//! fn run() -> Result<(), stencil_emit::EngineError> {
//!     let registry = Registry::with_builtin();
//!     let config = RunConfig::new("json").with_out("models");
//!     let mut emission = process(&registry, config, &json!({"tables": ["posts"]}))?;
//!     emission.write()?;
//!     for err in emission.errors() {
//!         eprintln!("{err}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod process;
pub mod registry;
pub mod target;
pub mod targets;

pub use error::{BoxError, EngineError, FileError};
pub use process::{process, write_raw, Emission, Emitter, FileBuffer, FileDiff, Fragment};
pub use registry::{Registry, DUMP_COMMAND};
pub use target::{GenerateFn, Target};
