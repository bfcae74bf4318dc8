use std::path::PathBuf;

use stationxml_nrl::binding::{BoundObject, Dialect, ValidationMode, parse_document};
use stationxml_nrl::diagnostics::RecordingDiagnostics;
use stationxml_nrl::error::LibraryError;
use stationxml_nrl::file_discovery::FileDiscovery;
use stationxml_nrl::library::{
    CancellationFlag, LibraryScanner, MatchKind, SampleRateIndex, ScanOptions,
    build_library_index,
};

use crate::common::*;

fn inventory() -> BoundObject {
    let diag = RecordingDiagnostics::new();
    parse_document(&ext_document(), Dialect::Ext, ValidationMode::Strict, &diag).unwrap()
}

fn options(kind: MatchKind) -> ScanOptions {
    ScanOptions {
        kind,
        max_concurrent: 2,
        multiple_match_warning: true,
    }
}

#[tokio::test]
async fn test_build_and_reload_index() {
    let library = TestLibrary::new();
    let index = build_library_index(&library.layout, &FileDiscovery::new()).await.unwrap();

    assert_eq!(index.len(), 2);
    assert_eq!(index.rate_for(&library.path(LOGGER_FILE)), Some(40.0));
    assert_eq!(index.rate_for(&library.path(FAST_LOGGER_FILE)), Some(100.0));

    index.write(&library.layout.index_file).unwrap();
    let reloaded = SampleRateIndex::load(&library.layout.index_file).unwrap();
    assert_eq!(reloaded, index);
}

#[tokio::test]
async fn test_index_skips_unreadable_files() {
    let library = TestLibrary::new();
    library.write("dataloggers/broken/RESP.XX.NR099..HHZ.BROKEN", BROKEN_RESP);
    let index = build_library_index(&library.layout, &FileDiscovery::new()).await.unwrap();
    assert_eq!(index.len(), 2);
}

#[test]
fn test_missing_index_is_reported_as_not_found() {
    let library = TestLibrary::new();
    match SampleRateIndex::load(&library.layout.index_file) {
        Err(LibraryError::NotFound { path }) => assert_eq!(path, library.layout.index_file),
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_scan_matches_sensor_and_logger() {
    let library = TestLibrary::new();
    let root = inventory();
    let diag = RecordingDiagnostics::new();

    let report = LibraryScanner::new(library.layout.clone(), options(MatchKind::Both))
        .scan(&root, &diag)
        .await
        .unwrap();

    for key in [BHZ, BHN] {
        let sensor = report.first_sensor(key).expect("sensor match");
        assert_eq!(sensor.path, library.path(SENSOR_FILE));
        assert_eq!(sensor.alignment.library_stage, 1);

        let logger = report.first_logger(key).expect("logger match");
        assert_eq!(logger.path, library.path(LOGGER_FILE));
        assert_eq!(logger.alignment.document_stage, 2);
        assert_eq!(logger.alignment.library_stage, 2);
        assert_eq!(logger.alignment.library_last_stage, Some(4));
    }
    assert!(report.first_sensor(LHZ).is_none());
    assert!(report.first_logger(LHZ).is_none());
    // no response, so never a target
    assert!(!report.sensor.contains_key(VM1));

    assert_eq!(report.files_scanned, 4);
    assert_eq!(report.files_pruned, 0);
    assert_eq!(report.parse_errors, 0);
    assert!(!report.cancelled);
    assert!(report.multiple_matches().is_empty());
}

#[tokio::test]
async fn test_scan_prunes_with_index() {
    let library = TestLibrary::new();
    let index = build_library_index(&library.layout, &FileDiscovery::new()).await.unwrap();
    let root = inventory();
    let diag = RecordingDiagnostics::new();

    let report = LibraryScanner::new(library.layout.clone(), options(MatchKind::Logger))
        .with_index(index)
        .scan(&root, &diag)
        .await
        .unwrap();

    // the 100 sps file matches no channel rate
    assert_eq!(report.files_pruned, 1);
    assert_eq!(report.files_scanned, 1);
    assert!(report.sensor.is_empty());
    assert_eq!(
        report.first_logger(BHZ).map(|m| m.path.clone()),
        Some(library.path(LOGGER_FILE))
    );
}

#[tokio::test]
async fn test_scan_counts_unreadable_files() {
    let library = TestLibrary::new().with_broken_file();
    let root = inventory();
    let diag = RecordingDiagnostics::new();

    let report = LibraryScanner::new(library.layout.clone(), options(MatchKind::Sensor))
        .scan(&root, &diag)
        .await
        .unwrap();

    assert_eq!(report.files_scanned, 3);
    assert_eq!(report.parse_errors, 1);
    assert!(report.logger.is_empty());
    assert_eq!(report.sensor.len(), 2);
}

#[tokio::test]
async fn test_duplicate_library_files_warn_multiple_match() {
    let library = TestLibrary::new();
    let copy: PathBuf = library.write("sensors/guralp/RESP.XX.NS002..BHZ.CMG3T.COPY", SENSOR_RESP);
    let root = inventory();
    let diag = RecordingDiagnostics::new();

    let report = LibraryScanner::new(library.layout.clone(), options(MatchKind::Sensor))
        .scan(&root, &diag)
        .await
        .unwrap();

    let matches = &report.sensor[BHZ];
    assert_eq!(matches.len(), 2);
    // sorted by path
    assert!(matches[0].path < matches[1].path);
    assert!(matches.iter().any(|m| m.path == copy));
    assert_eq!(report.multiple_matches(), vec![BHN, BHZ]);
    assert!(diag.has_warning_containing(&format!("MultipleMatch {}", BHZ)));
}

#[tokio::test]
async fn test_excluded_library_files_are_not_compared() {
    let library = TestLibrary::new();
    let root = inventory();
    let diag = RecordingDiagnostics::new();
    let discovery = FileDiscovery::new()
        .with_exclude_patterns(vec!["**/guralp/**".to_string()])
        .unwrap();

    let report = LibraryScanner::new(library.layout.clone(), options(MatchKind::Sensor))
        .with_discovery(discovery)
        .scan(&root, &diag)
        .await
        .unwrap();

    assert_eq!(report.files_scanned, 1);
    assert!(report.first_sensor(BHZ).is_none());
    assert!(report.sensor.is_empty());
}

#[tokio::test]
async fn test_cancelled_scan_is_partial() {
    let library = TestLibrary::new();
    let root = inventory();
    let diag = RecordingDiagnostics::new();
    let cancel = CancellationFlag::new();
    cancel.cancel();

    let report = LibraryScanner::new(library.layout.clone(), options(MatchKind::Both))
        .with_cancellation(cancel)
        .scan(&root, &diag)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.files_scanned, 0);
    assert!(report.sensor.is_empty() && report.logger.is_empty());
    assert!(diag.has_warning_containing("results are partial"));
}
