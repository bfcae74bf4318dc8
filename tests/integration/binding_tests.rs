use tempfile::TempDir;

use stationxml_nrl::binding::{
    BoundObject, ChannelRef, Dialect, ValidationMode, channels, export_dict, export_xml_string,
    find_channel, parse_document, parse_file, write_file,
};
use stationxml_nrl::diagnostics::RecordingDiagnostics;
use stationxml_nrl::schema::TypeId;

use crate::common::*;

fn parse_ext() -> BoundObject {
    let diag = RecordingDiagnostics::new();
    parse_document(&ext_document(), Dialect::Ext, ValidationMode::Strict, &diag)
        .expect("fixture should bind")
}

#[test]
fn test_ext_document_binds_extension_types() {
    let root = parse_ext();
    assert_eq!(root.type_id(), TypeId::SisRoot);
    assert_eq!(Dialect::of(&root), Some(Dialect::Ext));

    let keys: Vec<_> = channels(&root).iter().map(ChannelRef::key).collect();
    assert_eq!(keys, vec![BHZ, BHN, LHZ, VM1]);

    let bhz = find_channel(&root, BHZ).unwrap();
    assert_eq!(bhz.channel.type_id(), TypeId::SisChannel);
    let response = bhz.response().unwrap();
    assert_eq!(response.type_id(), TypeId::SisResponse);
    assert_eq!(response.objects("Stage").count(), 4);
    assert!(find_channel(&root, VM1).unwrap().response().is_none());
}

#[test]
fn test_export_and_reparse_is_identical() {
    let root = parse_ext();
    let diag = RecordingDiagnostics::new();
    let xml = export_xml_string(&root, ValidationMode::Strict, &diag).unwrap();
    assert!(xml.contains(r#"xsi:type="sis:RootType""#));
    assert!(xml.contains("<Latitude>34.148000</Latitude>"));
    assert!(xml.contains("<Longitude>-118.171000</Longitude>"));

    let again = parse_document(&xml, Dialect::Ext, ValidationMode::Strict, &diag).unwrap();
    assert_eq!(root, again);
}

#[test]
fn test_write_file_round_trip() {
    let temp = TempDir::new().unwrap();
    let input = write_fixture(temp.path(), "inventory.xml", &ext_document());
    let output = temp.path().join("copy.xml");
    let diag = RecordingDiagnostics::new();

    let root = parse_file(&input, Dialect::Ext, ValidationMode::Strict, &diag).unwrap();
    write_file(&root, &output, ValidationMode::Strict, &diag).unwrap();
    let again = parse_file(&output, Dialect::Ext, ValidationMode::Strict, &diag).unwrap();
    assert_eq!(root, again);
}

#[test]
fn test_json_export_of_channels() {
    let root = parse_ext();
    let diag = RecordingDiagnostics::new();
    let json = export_dict(&root, ValidationMode::Strict, &diag).unwrap();

    let station = &json["Network"][0]["Station"][0];
    assert_eq!(station["code"], "NS001");
    assert_eq!(station["Site"]["Name"], "Test site");
    let channels = station["Channel"].as_array().unwrap();
    assert_eq!(channels.len(), 4);
    assert_eq!(channels[0]["code"], "BHZ");
    assert_eq!(channels[0]["locationCode"], "");
    let stage = &channels[0]["Response"]["Stage"][0];
    assert_eq!(stage["number"], 1);
    assert_eq!(stage["PolesZeros"]["NormalizationFactor"], 2400.0);
}

#[test]
fn test_schema_version_depends_on_dialect() {
    let diag = RecordingDiagnostics::new();
    let err = parse_document(&ext_document(), Dialect::Fdsn, ValidationMode::Strict, &diag)
        .unwrap_err();
    assert!(err.to_string().contains("Invalid schemaVersion 3.0"));

    let diag = RecordingDiagnostics::new();
    let root = parse_document(
        &ext_document(),
        Dialect::Fdsn,
        ValidationMode::Permissive,
        &diag,
    )
    .unwrap();
    assert_eq!(root.type_id(), TypeId::Root);
    assert!(diag.has_warning_containing("Invalid schemaVersion 3.0"));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let temp = TempDir::new().unwrap();
    let diag = RecordingDiagnostics::new();
    let err = parse_file(
        &temp.path().join("absent.xml"),
        Dialect::Ext,
        ValidationMode::Strict,
        &diag,
    )
    .unwrap_err();
    assert!(matches!(err, stationxml_nrl::NrlError::Io(_)));
}
