use std::path::Path;

use mockall::mock;
use tempfile::TempDir;

use stationxml_nrl::NrlError;
use stationxml_nrl::error::OracleError;
use stationxml_nrl::oracle::{CommandOracle, OracleVerdict, SchemaGate, SchemaOracle};

use crate::common::*;

mock! {
    pub Validator {}

    impl SchemaOracle for Validator {
        fn check(&self, document: &Path, schema: &Path) -> Result<OracleVerdict, OracleError>;
    }
}

#[test]
fn test_gate_admits_passing_document() {
    let temp = TempDir::new().unwrap();
    let document = write_fixture(temp.path(), "inventory.xml", &ext_document());

    let mut oracle = MockValidator::new();
    oracle
        .expect_check()
        .withf(|document, schema| {
            document.ends_with("inventory.xml") && schema.ends_with("sis_extension.xsd")
        })
        .times(1)
        .returning(|_, _| Ok(OracleVerdict::pass()));

    let gate = SchemaGate::new(&oracle, "/schemas/sis_extension.xsd");
    assert!(gate.admit(&document).is_ok());
}

#[test]
fn test_gate_rejects_failing_document() {
    let mut oracle = MockValidator::new();
    oracle
        .expect_check()
        .times(1)
        .returning(|_, _| Ok(OracleVerdict::fail("line 12: element Foo not expected")));

    let gate = SchemaGate::new(&oracle, "schema.xsd");
    match gate.admit(Path::new("bad.xml")) {
        Err(NrlError::SchemaGate { file, diagnostics }) => {
            assert_eq!(file, Path::new("bad.xml"));
            assert!(diagnostics.contains("element Foo not expected"));
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_gate_propagates_launch_failure() {
    let mut oracle = MockValidator::new();
    oracle.expect_check().returning(|_, _| {
        Err(OracleError::Launch {
            program: "xmllint".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        })
    });

    let gate = SchemaGate::new(&oracle, "schema.xsd");
    let err = gate.admit(Path::new("doc.xml")).unwrap_err();
    assert!(matches!(err, NrlError::Oracle(OracleError::Launch { .. })));
}

#[test]
fn test_command_oracle_substitutes_placeholders() {
    let oracle = CommandOracle::new(vec![
        "xmllint".to_string(),
        "--schema".to_string(),
        "{schema}".to_string(),
        "{document}".to_string(),
    ])
    .unwrap();
    assert_eq!(
        oracle.arguments(Path::new("a.xml"), Path::new("s.xsd")),
        vec!["xmllint", "--schema", "s.xsd", "a.xml"]
    );
    assert!(matches!(
        CommandOracle::new(Vec::new()),
        Err(OracleError::EmptyCommand)
    ));
}

#[cfg(unix)]
#[test]
fn test_command_oracle_runs_program() {
    let passing = CommandOracle::new(vec!["echo".to_string(), "0".to_string()]).unwrap();
    let verdict = passing.check(Path::new("a.xml"), Path::new("s.xsd")).unwrap();
    assert!(verdict.passed);

    let failing = CommandOracle::new(vec![
        "sh".to_string(),
        "-c".to_string(),
        "echo 'a.xml:3: Element Foo not expected'; exit 1".to_string(),
    ])
    .unwrap();
    let verdict = failing.check(Path::new("a.xml"), Path::new("s.xsd")).unwrap();
    assert!(!verdict.passed);
    assert!(verdict.diagnostics.contains("Element Foo not expected"));

    let missing = CommandOracle::new(vec!["/nonexistent/validator".to_string()]).unwrap();
    assert!(matches!(
        missing.check(Path::new("a.xml"), Path::new("s.xsd")),
        Err(OracleError::Launch { .. })
    ));
}
