//! CLI integration tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

/// Build command for the fitsguard-cli binary (finds it in target/debug when run via cargo test).
fn fitsguard_cli() -> Command {
    Command::cargo_bin("fitsguard-cli").unwrap()
}

/// Path to fitsguard library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("fitsguard")
        .join("tests")
        .join("fixtures")
}

#[test]
fn test_cli_help() {
    let mut cmd = fitsguard_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("FITS"));
}

#[test]
fn test_cli_version() {
    let mut cmd = fitsguard_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_check_valid_file() {
    let mut cmd = fitsguard_cli();

    cmd.arg("check")
        .arg(fixtures_dir().join("events.json"))
        .arg("--schema")
        .arg(fixtures_dir().join("events_schema.json"));

    cmd.assert()
        .code(0)
        .stdout(predicate::str::contains("No problems found"));
}

#[test]
fn test_cli_check_bad_file() {
    let mut cmd = fitsguard_cli();

    cmd.arg("check")
        .arg(fixtures_dir().join("bad_events.json"))
        .arg("--schema")
        .arg(fixtures_dir().join("events_schema.json"));

    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("wrong unit"))
        .stdout(predicate::str::contains("required missing"));
}

#[test]
fn test_cli_check_fail_fast_mode() {
    let mut cmd = fitsguard_cli();

    cmd.arg("check")
        .arg(fixtures_dir().join("bad_events.json"))
        .arg("--schema")
        .arg(fixtures_dir().join("events_schema.json"))
        .arg("--mode")
        .arg("fail-fast");

    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("FAILED"))
        .stdout(predicate::str::contains("BITPIX"));
}

#[test]
fn test_cli_check_json_output() {
    let mut cmd = fitsguard_cli();

    cmd.arg("check")
        .arg(fixtures_dir().join("bad_events.json"))
        .arg("--schema")
        .arg(fixtures_dir().join("events_schema.json"))
        .arg("--format")
        .arg("json");

    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("\"passed\": false"))
        .stdout(predicate::str::contains("findings"));
}

#[test]
fn test_cli_check_nonexistent_file() {
    let mut cmd = fitsguard_cli();

    cmd.arg("check")
        .arg("does_not_exist.json")
        .arg("--schema")
        .arg(fixtures_dir().join("events_schema.json"));

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_cli_check_bad_schema_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.json");
    std::fs::write(&path, "{ not json").unwrap();

    let mut cmd = fitsguard_cli();
    cmd.arg("check")
        .arg(fixtures_dir().join("events.json"))
        .arg("--schema")
        .arg(&path);

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_cli_check_header_schema() {
    let dir = tempfile::tempdir().unwrap();
    let schema_path = dir.path().join("primary.json");
    std::fs::write(
        &schema_path,
        r#"[
            {"keyword": "SIMPLE", "position": 0, "allowed_values": [true]},
            {"keyword": "BITPIX", "position": 1, "allowed_values": [8, 16, 32, 64, -32, -64]}
        ]"#,
    )
    .unwrap();
    let header_path = dir.path().join("header.json");
    std::fs::write(
        &header_path,
        r#"[
            {"keyword": "SIMPLE", "value": true},
            {"keyword": "BITPIX", "value": 12}
        ]"#,
    )
    .unwrap();

    let mut cmd = fitsguard_cli();
    cmd.arg("check").arg(&header_path).arg("--schema").arg(&schema_path);

    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("BITPIX"));
}

#[test]
fn test_cli_schema_command() {
    let mut cmd = fitsguard_cli();

    cmd.arg("schema").arg(fixtures_dir().join("events_schema.json"));

    cmd.assert()
        .code(0)
        .stdout(predicate::str::contains("ENERGY"))
        .stdout(predicate::str::contains("XTENSION"))
        .stdout(predicate::str::contains("TFORM"));
}

#[test]
fn test_cli_output_formats_are_different() {
    let file = fixtures_dir().join("events.json");
    let schema = fixtures_dir().join("events_schema.json");

    let mut cmd_human = fitsguard_cli();
    cmd_human
        .arg("check")
        .arg(&file)
        .arg("--schema")
        .arg(&schema)
        .arg("--format")
        .arg("human");
    let human_output = cmd_human.output().unwrap();

    let mut cmd_json = fitsguard_cli();
    cmd_json
        .arg("check")
        .arg(&file)
        .arg("--schema")
        .arg(&schema)
        .arg("--format")
        .arg("json");
    let json_output = cmd_json.output().unwrap();

    assert_ne!(
        human_output.stdout, json_output.stdout,
        "Different formats should produce different output"
    );
}
