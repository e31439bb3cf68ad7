//! CLI parsing tests for the hashdex command
//!
//! Tests that verify CLI argument parsing and the offline commands.

use std::path::PathBuf;

use assert_cmd::Command;
use hashdex_index::{analyze, DocumentSchema, FieldKind, Fingerprint};
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the hashdex binary
#[allow(deprecated)]
fn hashdex() -> Command {
    let mut cmd = Command::cargo_bin("hashdex").expect("Failed to find hashdex binary");
    cmd.env_remove("HASHDEX_CONFIG").env_remove("HASHDEX_URL");
    cmd
}

const CONFIG: &str = r#"
[store]
url = "redis://127.0.0.1:1"

[[documents]]
name = "cars"

[[documents.fields]]
name = "year"
value_type = "u32"

[[documents.fields]]
name = "vin"
kind = "tag"
value_type = "string"
unique = true

[[documents.fields]]
name = "display_name"
value_type = "string"

[[documents]]
name = "settings"
"#;

/// Write the test config into a fresh directory.
fn config_file() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("hashdex.toml");
    std::fs::write(&path, CONFIG).expect("Failed to write config");
    (dir, path)
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_shows_all_commands() {
    hashdex()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("reconcile"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("schema"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_flag() {
    hashdex()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hashdex"));
}

#[test]
fn test_global_options_in_help() {
    hashdex()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--url"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("--quiet"));
}

// ============================================================================
// Argument Parsing Tests
// ============================================================================

#[test]
fn test_search_help() {
    hashdex()
        .args(["search", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--page"))
        .stdout(predicate::str::contains("--page-size"))
        .stdout(predicate::str::contains("--fields"))
        .stdout(predicate::str::contains("--output"));
}

#[test]
fn test_search_requires_type() {
    hashdex()
        .arg("search")
        .assert()
        .failure()
        .stderr(predicate::str::contains("TYPE"));
}

#[test]
fn test_search_rejects_unknown_output_format() {
    hashdex()
        .args(["search", "cars", "--output", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_config_subcommands_in_help() {
    hashdex()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("path"));
}

// ============================================================================
// Offline Command Tests
// ============================================================================

#[test]
fn test_schema_shows_resolved_kinds() {
    let (_dir, path) = config_file();

    hashdex()
        .arg("--config")
        .arg(&path)
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("cars (keys: cars:*)"))
        .stdout(predicate::str::is_match(r"year\s+Numeric").unwrap())
        .stdout(predicate::str::is_match(r"vin\s+Tag\s+unique").unwrap())
        .stdout(predicate::str::is_match(r"display_name\s+Text").unwrap())
        .stdout(predicate::str::contains("No indexed fields"));
}

#[test]
fn test_schema_fingerprint_matches_library() {
    let (_dir, path) = config_file();
    // The unique flag does not take part in the fingerprint
    let schema = DocumentSchema::builder("cars")
        .field::<u32>("year")
        .field_as::<String>("vin", FieldKind::Tag)
        .field::<String>("display_name")
        .build();
    let expected = Fingerprint::of(&analyze(&schema).unwrap().fields);

    hashdex()
        .args(["schema", "--type", "cars", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.as_str()));
}

#[test]
fn test_schema_json_output() {
    let (_dir, path) = config_file();

    let output = hashdex()
        .args(["schema", "--json", "--type", "cars", "--config"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["name"], "cars");
    assert_eq!(json[0]["fields"][0]["kind"], "numeric");
    assert_eq!(json[0]["fields"][1]["unique"], true);
    assert_eq!(json[0]["fingerprint"].as_str().map(str::len), Some(64));
}

#[test]
fn test_schema_unknown_type_fails() {
    let (_dir, path) = config_file();

    hashdex()
        .args(["schema", "--type", "boats", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("'boats' is not declared"));
}

#[test]
fn test_config_show_applies_url_override() {
    let (_dir, path) = config_file();

    hashdex()
        .args(["config", "show", "--url", "redis://other:6380", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("redis://other:6380"))
        .stdout(predicate::str::contains("[[documents]]"));
}

#[test]
fn test_config_init_creates_local_file() {
    let dir = TempDir::new().unwrap();

    hashdex()
        .current_dir(dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    assert!(dir.path().join(".hashdex").join("config.toml").exists());
}

#[test]
fn test_missing_config_file_fails() {
    hashdex()
        .args(["schema", "--config", "/nonexistent/hashdex.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config file"));
}

#[test]
fn test_config_path_json() {
    let dir = TempDir::new().unwrap();

    let output = hashdex()
        .current_dir(dir.path())
        .args(["config", "path", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["local"]
        .as_str()
        .is_some_and(|p| p.ends_with("config.toml")));
    assert_eq!(json["local_exists"], false);
}
