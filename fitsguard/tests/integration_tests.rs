//! End-to-end tests over JSON fixtures: schemas and HDUs loaded from disk,
//! the way the CLI consumes them.

use fitsguard::prelude::*;
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
}

fn event_schema() -> TableSchema {
    serde_json::from_str(&fixture("events_schema.json")).unwrap()
}

#[test]
fn test_schema_fixture_gets_implicit_bintable_header() {
    let schema = event_schema();
    assert!(schema.header().get("XTENSION").is_some());
    assert!(schema.header().get("OBS_ID").is_some());
    let names: Vec<&str> = schema.column_names().collect();
    assert_eq!(names, ["EVENT_ID", "ENERGY", "RA", "DETECTOR_POS"]);
}

#[test]
fn test_good_fixture_passes() {
    let hdu: TableHdu = serde_json::from_str(&fixture("events.json")).unwrap();
    let findings = event_schema().validate_hdu(&hdu, Mode::Collect).unwrap();
    assert!(findings.is_empty(), "{findings:?}");
}

#[test]
fn test_bad_fixture_findings() {
    let hdu: TableHdu = serde_json::from_str(&fixture("bad_events.json")).unwrap();
    let findings = event_schema().validate_hdu(&hdu, Mode::Collect).unwrap();
    let kinds: Vec<ErrorKind> = findings.iter().map(|f| f.kind).collect();

    // BITPIX is 16 where BINTABLE requires 8
    assert!(kinds.contains(&ErrorKind::WrongValue));
    // SURPRISE is not declared
    assert!(kinds.contains(&ErrorKind::UnexpectedCard));
    // EVENT_ID column is absent
    assert!(kinds.contains(&ErrorKind::RequiredMissing));
    // ENERGY arrives in degrees
    assert!(kinds.contains(&ErrorKind::WrongUnit));
}

#[test]
fn test_bad_fixture_fails_fast() {
    let hdu: TableHdu = serde_json::from_str(&fixture("bad_events.json")).unwrap();
    let err = event_schema().validate_hdu(&hdu, Mode::FailFast).unwrap_err();
    // the first hard failure is the BITPIX value
    assert_eq!(err.kind, ErrorKind::WrongValue);
    assert!(err.message.contains("BITPIX"));
}

#[test]
fn test_log_mode_reports_nothing_to_the_caller() {
    let hdu: TableHdu = serde_json::from_str(&fixture("bad_events.json")).unwrap();
    let findings = event_schema().validate_hdu(&hdu, Mode::Log).unwrap();
    assert!(findings.is_empty());
}

#[test]
fn test_schema_survives_a_disk_round_trip() {
    let schema = event_schema();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.json");
    fs::write(&path, serde_json::to_string_pretty(&schema).unwrap()).unwrap();
    let reloaded: TableSchema = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(reloaded, schema);
}

#[test]
fn test_invalid_schema_fixture_is_rejected_at_load() {
    // a column with a unit on logical data is a declaration error, caught
    // during deserialization rather than validation
    let bad = r#"{"columns": [{"name": "flag", "dtype": "logical", "unit": "m"}]}"#;
    let err = serde_json::from_str::<TableSchema>(bad).unwrap_err();
    assert!(err.to_string().contains("unit"));
}

#[test]
fn test_shaped_column_fixture() {
    let mut hdu: TableHdu = serde_json::from_str(&fixture("events.json")).unwrap();
    let positions = Quantity::matrix(vec![vec![0.5, 1.0], vec![1.5, 2.0], vec![2.5, 3.0]])
        .unwrap()
        .with_unit("m".parse().unwrap());
    hdu.insert_column("DETECTOR_POS", positions);

    // float64 literals that are f32-exact cast cleanly to the declared float32
    let findings = event_schema().validate_hdu(&hdu, Mode::Collect).unwrap();
    assert!(findings.is_empty(), "{findings:?}");

    // a third per-row coordinate violates the declared [2] shape
    let wide = Quantity::matrix(vec![vec![0.0, 0.0, 0.0]])
        .unwrap()
        .with_unit("m".parse().unwrap());
    hdu.columns.retain(|c| c.name != "DETECTOR_POS");
    hdu.insert_column("DETECTOR_POS", wide);
    let findings = event_schema().validate_hdu(&hdu, Mode::Collect).unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].kind, ErrorKind::WrongShape);
}
