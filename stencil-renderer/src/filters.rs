//! Baseline template helpers available to every target.
//!
//! Casing helpers are also exported to extension scripts through [`CASES`].

use std::collections::HashMap;

use heck::{
    ToKebabCase, ToLowerCamelCase, ToPascalCase, ToShoutySnakeCase, ToSnakeCase, ToTitleCase,
};
use sha2::{Digest, Sha256};
use tera::{Filter, Result, Value};

// ---------------------------------------------------------------------------
// Casing
// ---------------------------------------------------------------------------

fn snake(s: &str) -> String {
    s.to_snake_case()
}

fn pascal(s: &str) -> String {
    s.to_pascal_case()
}

fn camel(s: &str) -> String {
    s.to_lower_camel_case()
}

fn kebab(s: &str) -> String {
    s.to_kebab_case()
}

fn shouty_snake(s: &str) -> String {
    s.to_shouty_snake_case()
}

fn title(s: &str) -> String {
    s.to_title_case()
}

/// Casing helpers, by name.
pub const CASES: &[(&str, fn(&str) -> String)] = &[
    ("snake_case", snake),
    ("pascal_case", pascal),
    ("camel_case", camel),
    ("kebab_case", kebab),
    ("shouty_snake_case", shouty_snake),
    ("title_case", title),
];

/// A string-to-string casing filter.
#[derive(Clone, Copy)]
pub(crate) struct CaseFilter {
    pub name: &'static str,
    pub convert: fn(&str) -> String,
}

impl Filter for CaseFilter {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
        let s = value
            .as_str()
            .ok_or_else(|| tera::Error::msg(format!("{} filter expects a string", self.name)))?;
        Ok(Value::String((self.convert)(s)))
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Double-quote a value with JSON string escaping.
pub(crate) fn quote(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    let s = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let quoted = serde_json::to_string(&s).map_err(|e| tera::Error::msg(e.to_string()))?;
    Ok(Value::String(quoted))
}

/// Pad a string with trailing spaces up to `width` characters.
pub(crate) fn pad_right(value: &Value, args: &HashMap<String, Value>) -> Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("pad_right filter expects a string"))?;
    let width = args
        .get("width")
        .and_then(Value::as_u64)
        .ok_or_else(|| tera::Error::msg("pad_right filter requires a numeric `width` argument"))?;
    Ok(Value::String(format!("{s:<width$}", width = width as usize)))
}

/// Hex-encoded SHA-256 digest of a string.
pub(crate) fn sha256(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("sha256 filter expects a string"))?;
    let mut h = Sha256::new();
    h.update(s.as_bytes());
    Ok(Value::String(hex::encode(h.finalize())))
}

// ---------------------------------------------------------------------------
// Sequences
// ---------------------------------------------------------------------------

/// Drop repeated elements, keeping the first occurrence.
pub(crate) fn uniq(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    let items = value
        .as_array()
        .ok_or_else(|| tera::Error::msg("uniq filter expects an array"))?;
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    Ok(Value::Array(out))
}

/// Drop nulls and empty strings.
pub(crate) fn compact(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    let items = value
        .as_array()
        .ok_or_else(|| tera::Error::msg("compact filter expects an array"))?;
    let out = items
        .iter()
        .filter(|v| !v.is_null() && v.as_str() != Some(""))
        .cloned()
        .collect();
    Ok(Value::Array(out))
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

fn numbers(name: &str, args: &HashMap<String, Value>) -> Result<Vec<Value>> {
    let values = args
        .get("values")
        .and_then(Value::as_array)
        .ok_or_else(|| tera::Error::msg(format!("{name} requires a `values` array")))?;
    if values.is_empty() || values.iter().any(|v| !v.is_number()) {
        return Err(tera::Error::msg(format!(
            "{name} requires a non-empty array of numbers"
        )));
    }
    Ok(values.clone())
}

fn pick(name: &str, args: &HashMap<String, Value>, greater: bool) -> Result<Value> {
    let values = numbers(name, args)?;
    let mut best = values[0].clone();
    for v in &values[1..] {
        let (a, b) = (v.as_f64().unwrap_or(0.0), best.as_f64().unwrap_or(0.0));
        if (greater && a > b) || (!greater && a < b) {
            best = v.clone();
        }
    }
    Ok(best)
}

/// Largest of `values`.
pub(crate) fn max(args: &HashMap<String, Value>) -> Result<Value> {
    pick("max", args, true)
}

/// Smallest of `values`.
pub(crate) fn min(args: &HashMap<String, Value>) -> Result<Value> {
    pick("min", args, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apply(filter: fn(&Value, &HashMap<String, Value>) -> Result<Value>, input: Value) -> Value {
        filter(&input, &HashMap::new()).unwrap()
    }

    fn case(name: &str, input: &str) -> String {
        let (_, convert) = CASES.iter().find(|(n, _)| *n == name).unwrap();
        let filter = CaseFilter { name: "test", convert: *convert };
        filter
            .filter(&json!(input), &HashMap::new())
            .unwrap()
            .as_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_casing() {
        assert_eq!(case("snake_case", "AuthorBooks"), "author_books");
        assert_eq!(case("pascal_case", "author_books"), "AuthorBooks");
        assert_eq!(case("camel_case", "author_books"), "authorBooks");
        assert_eq!(case("kebab_case", "AuthorBooks"), "author-books");
        assert_eq!(case("shouty_snake_case", "authorBooks"), "AUTHOR_BOOKS");
        assert_eq!(case("title_case", "author_books"), "Author Books");
    }

    #[test]
    fn test_case_filter_rejects_non_string() {
        let filter = CaseFilter { name: "snake_case", convert: snake };
        let err = filter.filter(&json!(42), &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("snake_case"));
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(apply(quote, json!("say \"hi\"")), json!("\"say \\\"hi\\\"\""));
        assert_eq!(apply(quote, json!(7)), json!("\"7\""));
    }

    #[test]
    fn test_pad_right() {
        let mut args = HashMap::new();
        args.insert("width".to_string(), json!(6));
        assert_eq!(pad_right(&json!("id"), &args).unwrap(), json!("id    "));
        assert!(pad_right(&json!("id"), &HashMap::new()).is_err());
    }

    #[test]
    fn test_sha256() {
        assert_eq!(
            apply(sha256, json!("")),
            json!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
    }

    #[test]
    fn test_uniq_and_compact() {
        assert_eq!(apply(uniq, json!(["a", "b", "a", 1, 1])), json!(["a", "b", 1]));
        assert_eq!(apply(compact, json!(["a", "", null, "b"])), json!(["a", "b"]));
    }

    #[test]
    fn test_max_min() {
        let mut args = HashMap::new();
        args.insert("values".to_string(), json!([3, 9.5, -2]));
        assert_eq!(max(&args).unwrap(), json!(9.5));
        assert_eq!(min(&args).unwrap(), json!(-2));

        let mut empty = HashMap::new();
        empty.insert("values".to_string(), json!([]));
        assert!(max(&empty).is_err());
    }
}
