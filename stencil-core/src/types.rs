//! Template descriptors and target-declared extra options.
//!
//! A [`Template`] is what generation logic hands to the renderer: it names a
//! template resource and carries the payload the template sees as its
//! context. Descriptors are immutable once emitted.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Template descriptor
// ---------------------------------------------------------------------------

/// Identifies one template resource plus the data it renders.
///
/// The descriptor itself is the rendering context, so templates can refer to
/// `name`, `type`, `extra.*` and `data.*` directly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Template {
    /// Owning subfolder inside the resource tree; empty for the root.
    #[serde(default)]
    pub set: String,
    /// Template name, e.g. `table`.
    pub template: String,
    /// Type discriminator, e.g. `view` or `enum`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Instance name, e.g. the table name.
    #[serde(default)]
    pub name: String,
    /// Opaque payload handed to the template.
    #[serde(default)]
    pub data: Value,
    /// Additional named values.
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
}

impl Template {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Self::default()
        }
    }

    pub fn with_set(mut self, set: impl Into<String>) -> Self {
        self.set = set.into();
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Resource stem: `<set>/<template>`, or just `<template>` without a set.
    pub fn file(&self) -> String {
        if self.set.is_empty() {
            self.template.clone()
        } else {
            format!("{}/{}", self.set, self.template)
        }
    }

    /// Merge ordering key: template name, then type, then instance name.
    pub fn sort_key(&self) -> (&str, &str, &str) {
        (&self.template, &self.kind, &self.name)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file())?;
        if !self.name.is_empty() {
            write!(f, " ({})", self.name)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Extra options
// ---------------------------------------------------------------------------

/// Value type of a target-declared option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlagKind {
    Bool,
    #[default]
    String,
    Int,
    List,
}

/// An extra option a target declares for its runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagOption {
    /// Key under which the value lives in [`RunConfig::options`](crate::RunConfig).
    pub key: String,
    pub kind: FlagKind,
    pub desc: String,
    #[serde(default)]
    pub default: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<char>,
    /// Allowed values; empty means unrestricted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<String>,
}

impl FlagOption {
    pub fn new(key: impl Into<String>, kind: FlagKind, desc: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            desc: desc.into(),
            default: Value::Null,
            short: None,
            enums: Vec::new(),
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = default;
        self
    }

    pub fn with_short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn with_enums<I, S>(mut self, enums: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enums = enums.into_iter().map(Into::into).collect();
        self
    }
}

/// A [`FlagOption`] tagged with the target that declared it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagSet {
    /// Owning target name.
    pub target: String,
    /// Option key, duplicated for convenient lookup.
    pub name: String,
    pub flag: FlagOption,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
