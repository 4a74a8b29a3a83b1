//! The callable namespace templates are parsed against.
//!
//! A [`FuncMap`] holds named tera filters and named tera functions. It is
//! built once per run (baseline or target-supplied set, then the script
//! extension on top) and registered into every template the run parses.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tera::{Filter, Function, Tera, Value};

use crate::filters::{self, CaseFilter, CASES};

/// Named filters and functions for one run.
#[derive(Clone, Default)]
pub struct FuncMap {
    filters: BTreeMap<String, Arc<dyn Filter>>,
    functions: BTreeMap<String, Arc<dyn Function>>,
}

impl FuncMap {
    /// An empty environment; tera's built-ins are still available.
    pub fn new() -> Self {
        Self::default()
    }

    /// The general-purpose helper set shared by every target.
    pub fn base() -> Self {
        let mut funcs = Self::new();
        for &(name, convert) in CASES {
            funcs.insert_filter(name, CaseFilter { name, convert });
        }
        funcs.insert_filter("quote", filters::quote);
        funcs.insert_filter("pad_right", filters::pad_right);
        funcs.insert_filter("sha256", filters::sha256);
        funcs.insert_filter("uniq", filters::uniq);
        funcs.insert_filter("compact", filters::compact);
        funcs.insert_function("max", filters::max);
        funcs.insert_function("min", filters::min);
        funcs
    }

    pub fn insert_filter<F: Filter + 'static>(&mut self, name: impl Into<String>, filter: F) {
        self.filters.insert(name.into(), Arc::new(filter));
    }

    pub fn insert_function<F: Function + 'static>(&mut self, name: impl Into<String>, function: F) {
        self.functions.insert(name.into(), Arc::new(function));
    }

    /// Add every entry of `other`, replacing same-named entries.
    pub fn merge(&mut self, other: FuncMap) {
        self.filters.extend(other.filters);
        self.functions.extend(other.functions);
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.functions.is_empty()
    }

    pub(crate) fn register(&self, tera: &mut Tera) {
        for (name, filter) in &self.filters {
            tera.register_filter(name, SharedFilter(Arc::clone(filter)));
        }
        for (name, function) in &self.functions {
            tera.register_function(name, SharedFunction(Arc::clone(function)));
        }
    }
}

impl fmt::Debug for FuncMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncMap")
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

struct SharedFilter(Arc<dyn Filter>);

impl Filter for SharedFilter {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.0.filter(value, args)
    }

    fn is_safe(&self) -> bool {
        self.0.is_safe()
    }
}

struct SharedFunction(Arc<dyn Function>);

impl Function for SharedFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.0.call(args)
    }

    fn is_safe(&self) -> bool {
        self.0.is_safe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(funcs: &FuncMap, src: &str) -> String {
        let mut tera = Tera::default();
        funcs.register(&mut tera);
        tera.add_raw_template("t", src).unwrap();
        tera.render("t", &tera::Context::new()).unwrap()
    }

    #[test]
    fn base_contains_helpers() {
        let base = FuncMap::base();
        for name in ["snake_case", "pascal_case", "quote", "sha256", "uniq", "compact"] {
            assert!(base.has_filter(name), "missing filter {name}");
        }
        assert!(base.has_function("max"));
        assert!(base.has_function("min"));
    }

    #[test]
    fn base_helpers_render() {
        let out = render(
            &FuncMap::base(),
            r#"{{ "author_books" | pascal_case }} {{ max(values=[1, 4, 2]) }}"#,
        );
        assert_eq!(out, "AuthorBooks 4");
    }

    #[test]
    fn merge_shadows_same_named_entries() {
        let mut funcs = FuncMap::base();
        let mut ext = FuncMap::new();
        ext.insert_filter(
            "snake_case",
            |_: &Value, _: &HashMap<String, Value>| -> tera::Result<Value> { Ok(json!("shadowed")) },
        );
        funcs.merge(ext);
        assert_eq!(render(&funcs, r#"{{ "AuthorBooks" | snake_case }}"#), "shadowed");
        assert!(funcs.has_filter("kebab_case"));
    }

    #[test]
    fn debug_lists_names_only() {
        let mut funcs = FuncMap::new();
        funcs.insert_function("now", |_: &HashMap<String, Value>| -> tera::Result<Value> {
            Ok(json!(0))
        });
        let dbg = format!("{funcs:?}");
        assert!(dbg.contains("now"));
        assert!(!funcs.is_empty());
    }
}
