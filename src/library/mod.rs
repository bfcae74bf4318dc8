//! The reference response library: its directory layout, the logger
//! sample-rate index, the concurrent scan that matches channels against
//! library files and the per-file check of a single channel.

mod check;
mod index;
mod scan;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use check::{CheckDirs, FileCheck, LibraryPart, check_channel};
pub use index::{SampleRateIndex, build_library_index, final_rate};
pub use scan::{CancellationFlag, LibraryMatch, LibraryScanner, MatchReport, ScanOptions};

pub const SENSORS_DIR: &str = "sensors";
pub const DATALOGGERS_DIR: &str = "dataloggers";
pub const INDEX_FILE: &str = "logger_sample_rate.sort";

/// Locations inside a library root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryLayout {
    pub root: PathBuf,
    pub sensors: PathBuf,
    pub dataloggers: PathBuf,
    pub index_file: PathBuf,
}

impl LibraryLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            sensors: root.join(SENSORS_DIR),
            dataloggers: root.join(DATALOGGERS_DIR),
            index_file: root.join(INDEX_FILE),
            root,
        }
    }

    /// Use a different index file; relative names resolve under the root
    pub fn with_index_file(mut self, index_file: impl AsRef<Path>) -> Self {
        self.index_file = self.root.join(index_file);
        self
    }

    /// `path` relative to the library root with `/` separators, as used in
    /// library references. Paths outside the root are returned unchanged.
    pub fn relative(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => path.to_string_lossy().to_string(),
        }
    }
}

/// Which library subtrees a scan compares against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Sensor,
    Logger,
    #[default]
    Both,
}

impl MatchKind {
    pub fn includes_sensors(self) -> bool {
        matches!(self, MatchKind::Sensor | MatchKind::Both)
    }

    pub fn includes_loggers(self) -> bool {
        matches!(self, MatchKind::Logger | MatchKind::Both)
    }
}
