//! End-to-end tests: load a program description, verify it, inspect the report

mod common;

use anyhow::Result;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;
use trustcheck_core::program::{Position, VarId};
use trustcheck_core::qual::TrustQualifier;
use trustcheck_core::verifier::CallSite;
use trustcheck_core::{
    AttributionOracle, Program, ProgramError, ProgramOracle, QualifierHierarchy, TrustHierarchy,
    TrustVerifier, VerifierConfig, Violation,
};

fn verify_file(name: &str, config: VerifierConfig) -> Result<trustcheck_core::VerificationReport> {
    common::init_test_logging();
    let program = Program::load(common::fixture(name))?;
    let oracle = ProgramOracle::new(&program);
    let mut verifier = TrustVerifier::new(&oracle, config);
    Ok(verifier.verify(&program))
}

#[test]
fn test_basic_fixture() -> Result<()> {
    let report = verify_file("basic.yml", VerifierConfig::default())?;

    assert_eq!(report.program, "basic");
    assert_eq!(report.diagnostics.len(), 1);

    let diagnostic = &report.diagnostics[0];
    assert_eq!(
        diagnostic.violation,
        Violation::TrustLevelTooLow {
            found: 2,
            required: 3
        }
    );
    assert_eq!(diagnostic.site, CallSite::Receiver);
    assert_eq!(diagnostic.callee, "TrustLevelTwo.m3");
    assert_eq!(diagnostic.position, Position::new(30, 14));
    Ok(())
}

#[test]
fn test_basic_fixture_with_method_index() -> Result<()> {
    let plain = verify_file("basic.yml", VerifierConfig::default())?;
    let indexed = verify_file(
        "basic.yml",
        VerifierConfig {
            index_methods: true,
            ..VerifierConfig::default()
        },
    )?;
    assert_eq!(plain.diagnostics, indexed.diagnostics);
    Ok(())
}

#[test]
fn test_clean_fixture_passes() -> Result<()> {
    let report = verify_file("clean.yml", VerifierConfig::default())?;
    assert!(report.passed());
    assert_eq!(report.calls_checked, 2);
    assert_eq!(report.declarations_refined, 1);
    Ok(())
}

#[test]
fn test_class_level_reaches_unannotated_variable() -> Result<()> {
    common::init_test_logging();
    let program = Program::from_yaml(
        "propagation",
        r#"
classes:
  - name: LevelFour
    trust: { level: 4 }
  - name: Main
    methods:
      - name: run
        body:
          - let: { name: v, type: LevelFour }
"#,
    )?;
    let oracle = ProgramOracle::new(&program);
    let v = VarId(0);
    assert_eq!(program.variable(v).name, "v");

    let mut verifier = TrustVerifier::new(&oracle, VerifierConfig::default());
    verifier.verify(&program);

    assert_eq!(
        verifier.effective_declaration_type(v).primary(),
        Some(TrustQualifier::trust(4))
    );
    assert_eq!(oracle.declaration_type(v).primary(), None);
    Ok(())
}

#[test]
fn test_report_serializes_for_tooling() -> Result<()> {
    let report = verify_file("basic.yml", VerifierConfig::default())?;
    let json = serde_json::to_value(&report)?;

    assert_eq!(json["program"], "basic");
    assert_eq!(json["calls_checked"], 4);
    assert_eq!(json["diagnostics"][0]["callee"], "TrustLevelTwo.m3");
    assert_eq!(json["diagnostics"][0]["violation"]["required"], 3);
    Ok(())
}

#[test]
fn test_missing_program_file() {
    let dir = TempDir::new().unwrap();
    let err = Program::load(dir.path().join("absent.yml")).unwrap_err();
    assert!(matches!(err, ProgramError::Read { .. }));
}

#[test]
fn test_program_loaded_from_disk_uses_file_stem() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("service.yml");
    fs::write(&path, "classes:\n  - name: Service\n")?;

    let program = Program::load(&path)?;
    assert_eq!(program.name, "service");
    assert_eq!(program.classes.len(), 1);
    Ok(())
}

#[test]
fn test_lattice_is_independent_of_call_checking() {
    // The lattice only relates identical qualifiers, even though the call
    // check above accepts a level 2 receiver for a level 1 method
    let lattice = TrustHierarchy;
    let two = TrustQualifier::trust(2);
    let one = TrustQualifier::trust(1);

    assert!(!lattice.is_subtype(&two, &one));
    assert_eq!(lattice.least_upper_bound(&two, &one), lattice.top());
    assert_eq!(lattice.greatest_lower_bound(&two, &two), two);
}
