//! `json` target: dumps the whole data model as one JSON document.

use serde_json::{json, Value};

use stencil_core::{FlagKind, FlagOption, StaticSource, Template};

use crate::error::EngineError;
use crate::process::Emitter;
use crate::registry::Registry;
use crate::target::Target;

pub const NAME: &str = "json";

const TEMPLATES: &[(&str, &str)] = &[(
    "json.json.tera",
    include_str!("templates/json.json.tera"),
)];

pub fn register(registry: &mut Registry) {
    registry.register(NAME, target());
}

pub fn target() -> Target {
    Target::new(StaticSource::from_static(TEMPLATES), generate)
        .for_commands(["schema"])
        .file_ext(".json")
        .flag(
            FlagOption::new("json-compact", FlagKind::Bool, "emit compact json")
                .with_default(json!(false)),
        )
        .flag(
            FlagOption::new("json-name", FlagKind::String, "output file name, without extension")
                .with_default(json!("schema")),
        )
        .order([NAME])
}

fn generate(emitter: &mut Emitter<'_>, model: &Value) -> Result<(), EngineError> {
    let name = emitter.config().option_str("json-name").unwrap_or("schema").to_string();
    let compact = emitter.config().option_bool("json-compact").unwrap_or(false);
    emitter.emit(
        Template::new(NAME)
            .with_name(name)
            .with_data(model.clone())
            .with_extra("compact", json!(compact)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use stencil_core::RunConfig;
    use tempfile::TempDir;

    use crate::process::process;

    fn run(config: RunConfig, model: Value) -> String {
        let mut registry = Registry::new();
        register(&mut registry);
        let emission = process(&registry, config, &model).unwrap();
        let file = emission.files().next().expect("one file");
        format!("{}|{}", file.name(), String::from_utf8_lossy(file.content()))
    }

    #[test]
    fn pretty_by_default() {
        let dir = TempDir::new().expect("tempdir");
        let out = run(
            RunConfig::new(NAME).with_out(dir.path()),
            json!({"tables": [{"name": "posts"}]}),
        );
        let (name, body) = out.split_once('|').unwrap();
        assert_eq!(name, "schema.json");
        assert!(body.contains("\n  \"tables\""), "{body}");
        let parsed: Value = serde_json::from_str(body).unwrap();
        assert_eq!(parsed["tables"][0]["name"], "posts");
    }

    #[test]
    fn compact_and_renamed() {
        let dir = TempDir::new().expect("tempdir");
        let config = RunConfig::new(NAME)
            .with_out(dir.path())
            .with_option("json-compact", json!(true))
            .with_option("json-name", json!("db"));
        let out = run(config, json!({"a": [1, 2]}));
        assert_eq!(out.trim_end(), "db.json|{\"a\":[1,2]}");
    }

    #[test]
    fn only_for_schema() {
        let mut registry = Registry::new();
        register(&mut registry);
        assert!(registry.is_for(NAME, "schema"));
        assert!(!registry.is_for(NAME, "query"));
    }
}
