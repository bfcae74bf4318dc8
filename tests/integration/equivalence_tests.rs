use std::path::Path;

use stationxml_nrl::binding::{BoundObject, Dialect, ValidationMode, find_channel, parse_document};
use stationxml_nrl::diagnostics::RecordingDiagnostics;
use stationxml_nrl::equivalence::{
    ResponseView, are_same_response, are_similar_logger, are_similar_sensor, compare_channels,
    unique_responses,
};
use stationxml_nrl::resp::parse_resp_str;

use crate::common::*;

fn inventory() -> BoundObject {
    let diag = RecordingDiagnostics::new();
    parse_document(&ext_document(), Dialect::Ext, ValidationMode::Strict, &diag).unwrap()
}

fn view(root: &BoundObject, key: &str) -> ResponseView {
    ResponseView::from_object(find_channel(root, key).unwrap().response().unwrap())
}

#[test]
fn test_sensor_file_against_document() {
    let root = inventory();
    let blockettes = parse_resp_str(SENSOR_RESP, Path::new("RESP.CMG3T")).unwrap();

    let result = are_similar_sensor(&view(&root, BHZ), &blockettes).unwrap();
    assert!(result.matched, "{}", result.reason);

    let result = are_similar_sensor(&view(&root, LHZ), &blockettes).unwrap();
    assert!(!result.matched);
    assert!(result.reason.contains("A0 norm factor"));
}

#[test]
fn test_logger_file_against_document() {
    let root = inventory();
    let blockettes = parse_resp_str(&logger_resp(40.0), Path::new("RESP.130.40")).unwrap();

    let result = are_similar_logger(&view(&root, BHZ), &blockettes).unwrap();
    assert!(result.matched, "{}", result.reason);
    let alignment = result.alignment.unwrap();
    assert_eq!(alignment.document_stage, 2);
    assert_eq!(alignment.library_last_stage, Some(4));

    let fast = parse_resp_str(&logger_resp(100.0), Path::new("RESP.130.100")).unwrap();
    let result = are_similar_logger(&view(&root, BHZ), &fast).unwrap();
    assert!(!result.matched);
    assert!(result.reason.contains("Input Samp Rate"));
}

#[test]
fn test_unique_responses_groups_identical_channels() {
    let root = inventory();
    let diag = RecordingDiagnostics::new();
    let groups = unique_responses(&root, &diag);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].representative, BHZ);
    assert_eq!(groups[0].channels, vec![BHZ.to_string(), BHN.to_string()]);
    assert_eq!(groups[1].channels, vec![LHZ.to_string()]);
    // the state-of-health channel has no response to compare
    assert!(diag.has_warning_containing(VM1));
}

#[test]
fn test_compare_channels() {
    let root = inventory();
    assert!(compare_channels(&root, BHZ, BHN).unwrap().matched);

    let result = compare_channels(&root, BHZ, LHZ).unwrap();
    assert!(!result.matched);
    assert!(!result.reason.is_empty());

    assert!(compare_channels(&root, BHZ, "XX.NS001..EHZ_").is_err());
}

#[test]
fn test_same_response_is_symmetric() {
    let root = inventory();
    let (bhz, lhz) = (view(&root, BHZ), view(&root, LHZ));
    assert!(are_same_response(&bhz, &bhz).matched);
    assert_eq!(
        are_same_response(&bhz, &lhz).matched,
        are_same_response(&lhz, &bhz).matched
    );
}
