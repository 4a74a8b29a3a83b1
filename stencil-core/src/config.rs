//! Run configuration threaded through every stage of a generation run.
//!
//! [`RunConfig`] replaces an implicit keyed context with named fields plus a
//! typed-accessor map for options declared by individual targets. It is
//! passed by reference into registry lookups, the function environment, the
//! renderer and the output pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::source::TemplateSource;
use crate::types::FlagSet;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Shared flag checked at resource reads, script execution and file writes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// RunConfig
// ---------------------------------------------------------------------------

/// Options for one generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RunConfig {
    /// Name of the registered target to run.
    pub template_type: String,
    /// Output-format discriminator passed through to targets.
    pub gen_type: String,
    /// Overrides the target's output file extension when non-empty.
    pub suffix: String,
    /// Directory the merged files are written to.
    pub out: PathBuf,
    /// Append to existing files instead of recreating them.
    pub append: bool,
    /// Write every fragment to this one file instead of per-target names.
    pub single: Option<String>,
    /// Target-declared extra options.
    pub options: BTreeMap<String, Value>,
    /// Override resource tree; takes precedence over the target's own.
    #[serde(skip)]
    pub src: Option<Arc<dyn TemplateSource>>,
    #[serde(skip)]
    pub cancel: CancelFlag,
}

impl RunConfig {
    pub fn new(template_type: impl Into<String>) -> Self {
        Self {
            template_type: template_type.into(),
            ..Self::default()
        }
    }

    /// Parse run options from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Load run options from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn with_out(mut self, out: impl Into<PathBuf>) -> Self {
        self.out = out.into();
        self
    }

    pub fn with_gen_type(mut self, gen_type: impl Into<String>) -> Self {
        self.gen_type = gen_type.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn with_single(mut self, single: impl Into<String>) -> Self {
        self.single = Some(single.into());
        self
    }

    pub fn with_src(mut self, src: impl TemplateSource + 'static) -> Self {
        self.src = Some(Arc::new(src));
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.set_option(key, value);
        self
    }

    pub fn set_option(&mut self, key: impl Into<String>, value: Value) {
        self.options.insert(key.into(), value);
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.option(key).and_then(Value::as_str)
    }

    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.option(key).and_then(Value::as_bool)
    }

    pub fn option_i64(&self, key: &str) -> Option<i64> {
        self.option(key).and_then(Value::as_i64)
    }

    /// The single-file override, treating an empty name as unset.
    pub fn single_file(&self) -> Option<&str> {
        self.single.as_deref().filter(|s| !s.is_empty())
    }

    /// Fill every unset option with the default its flag declares.
    ///
    /// Options the caller already set are left untouched; flags without a
    /// default are skipped.
    pub fn apply_flag_defaults(&mut self, flags: &[FlagSet]) {
        for set in flags {
            if set.flag.default.is_null() || self.options.contains_key(&set.flag.key) {
                continue;
            }
            self.options
                .insert(set.flag.key.clone(), set.flag.default.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
