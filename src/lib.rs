//! # stationxml-nrl Library
//!
//! Schema-driven binding of StationXML and ExtStationXML documents, a RESP
//! file reader, and the response comparisons used to match inventory
//! channels against the Nominal Response Library (NRL).

pub mod binding;
pub mod casting;
pub mod cli;
pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod equivalence;
pub mod error;
pub mod file_discovery;
pub mod library;
pub mod oracle;
pub mod output;
pub mod resp;
pub mod rewrite;
pub mod schema;
pub mod units;

pub use binding::{
    BoundObject, ChannelRef, Dialect, ValidationMode, channels, export_dict, export_xml,
    parse_document, parse_file, write_file,
};
pub use cli::{Cli, VerbosityLevel};
pub use config::{Config, ConfigManager};
pub use convert::{ConvertOptions, ConvertSummary, convert_to_extended};
pub use diagnostics::{Diagnostics, LogDiagnostics, RecordingDiagnostics};
pub use equivalence::{
    CheckResult, EquivalenceResult, ResponseView, StageAlignment, are_same_response,
    are_similar_logger, are_similar_sensor, compare_channels, unique_responses,
};
pub use error::{NrlError, Result};
pub use file_discovery::FileDiscovery;
pub use library::{
    CancellationFlag, CheckDirs, FileCheck, LibraryLayout, LibraryScanner, MatchKind,
    MatchReport, SampleRateIndex, ScanOptions, build_library_index, check_channel,
};
pub use oracle::{CommandOracle, OracleVerdict, SchemaGate, SchemaOracle};
pub use output::Output;
pub use resp::{Blockette, parse_resp_file, parse_resp_str};
pub use rewrite::{RewriteSummary, add_unity_responses, link_library_responses};
pub use units::{UnitChanges, clean_unit_names};
