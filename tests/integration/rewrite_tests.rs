use std::collections::BTreeMap;

use stationxml_nrl::binding::{
    BoundObject, Dialect, ValidationMode, export_xml_string, find_channel, parse_document,
};
use stationxml_nrl::diagnostics::RecordingDiagnostics;
use stationxml_nrl::library::{LibraryScanner, MatchKind, ScanOptions};
use stationxml_nrl::rewrite::{DEFAULT_URL_PREFIX, add_unity_responses, link_library_responses};
use stationxml_nrl::units::clean_unit_names;

use crate::common::*;

fn inventory() -> BoundObject {
    let diag = RecordingDiagnostics::new();
    parse_document(&ext_document(), Dialect::Ext, ValidationMode::Strict, &diag).unwrap()
}

/// Export strictly and bind the result again
fn reparse(root: &BoundObject) -> BoundObject {
    let diag = RecordingDiagnostics::new();
    let xml = export_xml_string(root, ValidationMode::Strict, &diag).unwrap();
    parse_document(&xml, Dialect::Ext, ValidationMode::Strict, &diag).unwrap()
}

#[test]
fn test_clean_unit_names_across_document() {
    let mut root = inventory();
    let diag = RecordingDiagnostics::new();
    let changes = clean_unit_names(&mut root, &diag);

    // six renamed unit objects in each of the three responses
    assert_eq!(changes.count, 18);
    let expected: BTreeMap<String, String> = [("COUNTS", "counts"), ("M/S", "m/s")]
        .into_iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();
    assert_eq!(changes.changes, expected);
    assert!(changes.unknown.is_empty());

    let again = reparse(&root);
    let bhz = find_channel(&again, BHZ).unwrap();
    let sensitivity = bhz.response().unwrap().object("InstrumentSensitivity").unwrap();
    assert_eq!(sensitivity.object("InputUnits").unwrap().text("Name"), Some("m/s"));

    // a second pass has nothing left to do
    assert_eq!(clean_unit_names(&mut root, &diag).count, 0);
}

#[test]
fn test_unity_response_for_soh_channel() {
    let mut root = inventory();
    let diag = RecordingDiagnostics::new();
    let units = BTreeMap::from([("VM1".to_string(), "volt".to_string())]);

    let summary = add_unity_responses(&mut root, &units, &diag).unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.changes.get(VM1).map(String::as_str), Some("unity Stage"));
    // channels with a full response are left alone
    assert!(!summary.changes.contains_key(BHZ));

    let again = reparse(&root);
    let response = find_channel(&again, VM1).unwrap().response().unwrap();
    let sensitivity = response.object("InstrumentSensitivity").unwrap();
    assert_eq!(sensitivity.object("InputUnits").unwrap().text("Name"), Some("volt"));
    let stage = response.objects("Stage").next().unwrap();
    assert_eq!(
        stage.object("Decimation").unwrap().object("InputSampleRate").unwrap().value_of(),
        Some(0.1)
    );
}

#[test]
fn test_unity_response_without_units_is_reported() {
    let mut root = inventory();
    let diag = RecordingDiagnostics::new();
    let summary = add_unity_responses(&mut root, &BTreeMap::new(), &diag).unwrap();

    assert_eq!(summary.count, 0);
    assert_eq!(
        summary.changes.get(VM1).map(String::as_str),
        Some("WARN: No input units")
    );
    assert!(find_channel(&root, VM1).unwrap().response().is_none());
}

#[tokio::test]
async fn test_link_matched_channels_to_library() {
    let library = TestLibrary::new();
    let mut root = inventory();
    let diag = RecordingDiagnostics::new();
    let options = ScanOptions {
        kind: MatchKind::Both,
        max_concurrent: 2,
        multiple_match_warning: true,
    };
    let report = LibraryScanner::new(library.layout.clone(), options)
        .scan(&root, &diag)
        .await
        .unwrap();

    let summary =
        link_library_responses(&mut root, &report, &library.layout, DEFAULT_URL_PREFIX, &diag)
            .unwrap();
    assert_eq!(summary.count, 2);
    assert_eq!(
        summary.changes.get(BHZ).map(String::as_str),
        Some("linked sensor and logger")
    );
    assert!(!summary.changes.contains_key(LHZ));

    let again = reparse(&root);
    let response = find_channel(&again, BHZ).unwrap().response().unwrap();
    assert!(response.has("InstrumentSensitivity"));
    assert_eq!(response.objects("Stage").count(), 0);

    let files: Vec<_> = response
        .objects("SubResponse")
        .map(|s| s.object("RESPFile").unwrap())
        .collect();
    assert_eq!(files.len(), 2);
    assert_eq!(
        files[0].text("ValueOf"),
        Some(format!("{}/{}", DEFAULT_URL_PREFIX, SENSOR_FILE).as_str())
    );
    assert_eq!(files[0].i64("stageFrom"), Some(1));
    assert_eq!(files[0].i64("stageTo"), Some(1));
    assert_eq!(
        files[1].text("ValueOf"),
        Some(format!("{}/{}", DEFAULT_URL_PREFIX, LOGGER_FILE).as_str())
    );
    assert_eq!(files[1].i64("stageFrom"), Some(2));
    assert_eq!(files[1].i64("stageTo"), Some(-1));

    // unmatched responses keep their stages
    let lhz = find_channel(&again, LHZ).unwrap().response().unwrap();
    assert_eq!(lhz.objects("Stage").count(), 4);
}
