//! Run-options file loading and override resource tree integration tests.

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use rstest::rstest;
use stencil_core::{ConfigError, DirSource, RunConfig, TemplateSource};

// ---------------------------------------------------------------------------
// 1. Loading run options
// ---------------------------------------------------------------------------

#[test]
fn load_options_file_from_disk() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("run.yaml");
    file.write_str(
        "template-type: json\ngen-type: schema\nsuffix: .out.json\nsingle: all.json\noptions:\n  json-name: db\n",
    )
    .expect("write");

    let cfg = RunConfig::load(file.path()).expect("load");
    assert_eq!(cfg.template_type, "json");
    assert_eq!(cfg.gen_type, "schema");
    assert_eq!(cfg.suffix, ".out.json");
    assert_eq!(cfg.single_file(), Some("all.json"));
    assert_eq!(cfg.option_str("json-name"), Some("db"));
    assert!(!cfg.append);
}

#[test]
fn load_missing_file_reports_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let err = RunConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "got: {err}");
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn load_malformed_yaml_reports_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("broken.yaml");
    file.write_str("- a list\n- not a mapping\n").expect("write");

    let err = RunConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("broken.yaml"));
}

// ---------------------------------------------------------------------------
// 2. Override resource trees
// ---------------------------------------------------------------------------

#[rstest]
#[case("table.sql.tera", "TABLE {{ name }}\n")]
#[case("pg/enum.sql.tera", "ENUM {{ name }}\n")]
fn dir_source_round_trips_files(#[case] path: &str, #[case] content: &str) {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child(path).write_str(content).expect("write");
    dir.child(path).assert(predicate::path::is_file());

    let src = DirSource::new(dir.path());
    assert_eq!(src.read(path).expect("read"), content.as_bytes());
    assert_eq!(src.files().expect("files"), vec![path.to_string()]);
}

#[test]
fn override_tree_is_carried_by_config() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("header.sql.tera").write_str("-- custom --\n").expect("write");

    let cfg = RunConfig::new("demo").with_src(DirSource::new(dir.path()));
    let src = cfg.src.as_ref().expect("override tree");
    assert_eq!(src.read("header.sql.tera").expect("read"), b"-- custom --\n");
}
