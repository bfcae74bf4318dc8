use chrono::{TimeZone, Utc};
use regex::Regex;

use stationxml_nrl::binding::{
    BoundObject, Dialect, ValidationMode, channels, export_xml_string, find_channel,
    parse_document,
};
use stationxml_nrl::convert::{ConvertOptions, convert_to_extended};
use stationxml_nrl::diagnostics::RecordingDiagnostics;
use stationxml_nrl::equivalence::ResponseView;
use stationxml_nrl::file_discovery::FileDiscovery;
use stationxml_nrl::library::{
    CheckDirs, LibraryPart, LibraryScanner, MatchKind, ScanOptions, check_channel,
};
use stationxml_nrl::rewrite::{DEFAULT_URL_PREFIX, link_library_responses};
use stationxml_nrl::schema::TypeId;

use crate::common::*;

fn fdsn_inventory() -> BoundObject {
    let diag = RecordingDiagnostics::new();
    parse_document(&fdsn_document(), Dialect::Fdsn, ValidationMode::Strict, &diag).unwrap()
}

fn options() -> ConvertOptions {
    ConvertOptions {
        now: Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap(),
        ..ConvertOptions::default()
    }
}

#[test]
fn test_converted_document_binds_as_extended() {
    let diag = RecordingDiagnostics::new();
    let (ext, summary) = convert_to_extended(&fdsn_inventory(), &options(), &diag).unwrap();
    assert_eq!(summary.channels, 4);
    assert!(summary.dropped_fields.is_empty());

    let xml = export_xml_string(&ext, ValidationMode::Strict, &diag).unwrap();
    assert!(xml.contains(r#"schemaVersion="3.0""#));
    let again = parse_document(&xml, Dialect::Ext, ValidationMode::Strict, &diag).unwrap();
    assert_eq!(again, ext);

    let keys: Vec<_> = channels(&again).iter().map(|c| c.key()).collect();
    assert_eq!(keys, vec![BHZ, BHN, LHZ, VM1]);
    let bhz = find_channel(&again, BHZ).unwrap();
    assert_eq!(bhz.channel.type_id(), TypeId::SisChannel);
    assert_eq!(bhz.response().map(BoundObject::type_id), Some(TypeId::SisResponse));
}

#[test]
fn test_convert_filters_channels() {
    let diag = RecordingDiagnostics::new();
    let only_broadband = ConvertOptions {
        only_channels: Some(Regex::new("BH.").unwrap()),
        ..options()
    };
    let (ext, summary) = convert_to_extended(&fdsn_inventory(), &only_broadband, &diag).unwrap();
    let keys: Vec<_> = channels(&ext).iter().map(|c| c.key()).collect();
    assert_eq!(keys, vec![BHZ, BHN]);
    assert_eq!(summary.removed.len(), 2);
    assert!(summary.removed.contains_key(LHZ));

    // none of the fixture channels has an end date
    let drop_current = ConvertOptions {
        drop_current: true,
        ..options()
    };
    let (ext, summary) = convert_to_extended(&fdsn_inventory(), &drop_current, &diag).unwrap();
    assert!(channels(&ext).is_empty());
    assert_eq!(summary.removed.len(), 4);
}

#[tokio::test]
async fn test_convert_then_link_to_library() {
    let library = TestLibrary::new();
    let diag = RecordingDiagnostics::new();
    let (mut ext, _) = convert_to_extended(&fdsn_inventory(), &options(), &diag).unwrap();

    let scan_options = ScanOptions {
        kind: MatchKind::Both,
        max_concurrent: 2,
        multiple_match_warning: true,
    };
    let report = LibraryScanner::new(library.layout.clone(), scan_options)
        .scan(&ext, &diag)
        .await
        .unwrap();
    let summary =
        link_library_responses(&mut ext, &report, &library.layout, DEFAULT_URL_PREFIX, &diag)
            .unwrap();
    assert_eq!(summary.count, 2);

    let xml = export_xml_string(&ext, ValidationMode::Strict, &diag).unwrap();
    assert!(xml.contains(&format!("{}/{}", DEFAULT_URL_PREFIX, SENSOR_FILE)));
    assert!(xml.contains(&format!("{}/{}", DEFAULT_URL_PREFIX, LOGGER_FILE)));
}

#[tokio::test]
async fn test_check_one_channel_against_manufacturer_dirs() {
    let library = TestLibrary::new();
    let root = fdsn_inventory();
    let bhz = find_channel(&root, BHZ).unwrap();
    let response = ResponseView::from_object(bhz.response().unwrap());
    let dirs = CheckDirs {
        sensor_dir: Some("guralp".to_string()),
        logger_dir: Some("reftek".to_string()),
    };

    let checks = check_channel(&library.layout, &response, &dirs, &FileDiscovery::new())
        .await
        .unwrap();

    let verdicts: Vec<_> = checks
        .iter()
        .map(|c| (c.part, library.layout.relative(&c.path), c.matched))
        .collect();
    assert_eq!(
        verdicts,
        vec![
            (LibraryPart::Sensor, SENSOR_FILE.to_string(), true),
            (LibraryPart::Logger, LOGGER_FILE.to_string(), true),
            (LibraryPart::Logger, FAST_LOGGER_FILE.to_string(), false),
        ]
    );
    assert!(!checks[2].reason.is_empty());
}
