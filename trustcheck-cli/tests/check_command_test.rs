//! Integration tests for the `trustcheck` binary

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;
use tempfile::TempDir;

/// Helper to run trustcheck in a directory
fn run_trustcheck(dir: &Path, args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_trustcheck"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to run trustcheck")
}

/// Fixture shared with the core crate's tests
fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../trustcheck-core/tests/fixtures")
        .join(name)
}

const ARGUMENT_VIOLATION: &str = r#"
classes:
  - name: Secret
    trust: { level: 1 }
  - name: Sink
    methods:
      - name: store
        static: true
        requires: { level: 2 }
        params:
          - { name: s, type: Secret }
  - name: Main
    methods:
      - name: run
        params:
          - { name: s, type: Secret }
        body:
          - expr: { call: { method: store, class: Sink, args: [ { var: s } ] } }
            line: 9
"#;

#[test]
fn test_check_clean_program_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let clean = fixture("clean.yml");

    let output = run_trustcheck(temp_dir.path(), &["check", clean.to_str().unwrap()]);

    assert!(
        output.status.success(),
        "check failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✓ clean"));
    assert!(stdout.contains("All programs passed"));
}

#[test]
fn test_check_reports_violation_and_fails() {
    let temp_dir = TempDir::new().unwrap();
    let basic = fixture("basic.yml");

    let output = run_trustcheck(temp_dir.path(), &["check", basic.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✗ basic"));
    assert!(stdout.contains(
        "30:14: error: (trust.level.too.low) receiver of call to TrustLevelTwo.m3"
    ));
    assert!(stdout.contains("1 violations in 1 programs"));
}

#[test]
fn test_check_json_output() {
    let temp_dir = TempDir::new().unwrap();
    let basic = fixture("basic.yml");
    let clean = fixture("clean.yml");

    let output = run_trustcheck(
        temp_dir.path(),
        &[
            "check",
            basic.to_str().unwrap(),
            clean.to_str().unwrap(),
            "--json",
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["total_programs"], 2);
    assert_eq!(json["total_violations"], 1);
    assert_eq!(json["programs"][0]["diagnostics"][0]["violation"]["found"], 2);
    assert_eq!(json["programs"][1]["diagnostics"], Value::Array(vec![]));
}

#[test]
fn test_receiver_only_flag_and_config_file() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("program.yml"), ARGUMENT_VIOLATION).unwrap();

    let output = run_trustcheck(temp_dir.path(), &["check", "program.yml"]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("9:0: error: (trust.level.too.low) argument 0 of call to Sink.store"));

    let output = run_trustcheck(temp_dir.path(), &["check", "program.yml", "--receiver-only"]);
    assert!(output.status.success());

    // The same setting from trustcheck.yml in the working directory
    fs::write(temp_dir.path().join("trustcheck.yml"), "check_arguments: false\n").unwrap();
    let output = run_trustcheck(temp_dir.path(), &["check", "program.yml"]);
    assert!(output.status.success());
}

#[test]
fn test_unloadable_program_fails() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("broken.yml"),
        "classes:\n  - name: A\n    trust: { kind: trust_requirement }\n",
    )
    .unwrap();

    let output = run_trustcheck(temp_dir.path(), &["check", "broken.yml", "missing.yml"]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("@TrustReq is not applicable to a type"));
    assert!(stdout.contains("Failed to read program description"));
}

#[test]
fn test_qualifiers_command() {
    let temp_dir = TempDir::new().unwrap();

    let output = run_trustcheck(temp_dir.path(), &["qualifiers", "--json"]);
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["root"], "@Trust(level = 0)");
    assert_eq!(json["qualifiers"].as_array().unwrap().len(), 3);
    assert_eq!(json["qualifiers"][2]["key"], "trust_requirement");

    fs::write(temp_dir.path().join("trustcheck.yml"), "qualifiers: [trust]\n").unwrap();
    let output = run_trustcheck(temp_dir.path(), &["qualifiers"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("@Trust"));
    assert!(!stdout.contains("@TrustReq"));
}
