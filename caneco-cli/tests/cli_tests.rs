//! CLI integration tests

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Build command for the caneco-cli binary.
fn caneco_cli() -> Command {
    cargo_bin_cmd!("caneco-cli")
}

/// Path to the caneco library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("caneco")
        .join("tests")
        .join("fixtures")
}

#[test]
fn test_cli_help() {
    let mut cmd = caneco_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Caneco BT"));
}

#[test]
fn test_cli_version() {
    let mut cmd = caneco_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_convert_writes_document() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("project.xml");

    let mut cmd = caneco_cli();
    cmd.arg("convert")
        .arg(fixtures_dir().join("components.txt"))
        .arg("-o")
        .arg(&out);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Converted:    8"))
        .stdout(predicate::str::contains("- X1"));

    let xml = std::fs::read_to_string(&out).unwrap();
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(xml.contains("<Product id=\"PG00008\">"));
}

#[test]
fn test_cli_convert_json_summary() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("project.xml");

    let mut cmd = caneco_cli();
    cmd.arg("convert")
        .arg(fixtures_dir().join("components.json"))
        .arg("--output")
        .arg(&out)
        .arg("--format")
        .arg("json")
        .arg("--validate");

    let output = cmd.assert().success().get_output().stdout.clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["summary"]["converted"], 2);
    assert_eq!(json["summary"]["unclassified"][0], "X1");
    assert_eq!(json["validation"]["ok"], true);
}

#[test]
fn test_cli_fail_on_unclassified() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("project.xml");

    let mut cmd = caneco_cli();
    cmd.arg("convert")
        .arg(fixtures_dir().join("components.txt"))
        .arg("-o")
        .arg(&out)
        .arg("--fail-on-unclassified");

    cmd.assert().failure().code(1);
    // The document is still written; only the exit status reports the gap.
    assert!(out.exists());
}

#[test]
fn test_cli_missing_template_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("project.xml");

    let mut cmd = caneco_cli();
    cmd.arg("convert")
        .arg(fixtures_dir().join("components.txt"))
        .arg("-o")
        .arg(&out)
        .arg("--config")
        .arg(fixtures_dir().join("broken_hint_config.json"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Template not found: DISJONCTEUR GENERAL"));
    assert!(!out.exists());
}

#[test]
fn test_cli_nonexistent_input() {
    let mut cmd = caneco_cli();

    cmd.arg("convert").arg("does_not_exist.txt");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_cli_validate_reference_export() {
    let mut cmd = caneco_cli();

    cmd.arg("validate")
        .arg(fixtures_dir().join("reference_export.xml"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("no mismatches"));
}

#[test]
fn test_cli_validate_against_reference_reports_unknown_seed() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("project.xml");

    caneco_cli()
        .arg("convert")
        .arg(fixtures_dir().join("components.json"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let mut cmd = caneco_cli();
    cmd.arg("validate")
        .arg(&out)
        .arg("--reference")
        .arg(fixtures_dir().join("reference_export.xml"))
        .arg("--format")
        .arg("json");

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("\"ok\": false"))
        .stdout(predicate::str::contains("SC4_19030"));
}

#[test]
fn test_cli_templates() {
    let mut cmd = caneco_cli();

    cmd.arg("templates").arg("--verbose");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("TR01"))
        .stdout(predicate::str::contains("PRT_CAL"))
        .stdout(predicate::str::contains("(differential)"));
}
