#![allow(dead_code)]

pub mod fixtures;

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use stationxml_nrl::library::LibraryLayout;

pub use fixtures::*;

/// Relative paths of the files in the test library
pub const SENSOR_FILE: &str = "sensors/guralp/RESP.XX.NS001..BHZ.CMG3T.120.1500";
pub const OTHER_SENSOR_FILE: &str = "sensors/streckeisen/RESP.XX.NS007..BHZ.STS2.120.1500";
pub const LOGGER_FILE: &str = "dataloggers/reftek/RESP.XX.NR001..HHZ.130.1.40";
pub const FAST_LOGGER_FILE: &str = "dataloggers/reftek/RESP.XX.NR002..HHZ.130.1.100";
pub const BROKEN_FILE: &str = "sensors/broken/RESP.XX.NS099..BHZ.BROKEN";

/// A throwaway NRL tree: two sensors, two dataloggers and one file that
/// does not parse
pub struct TestLibrary {
    pub dir: TempDir,
    pub layout: LibraryLayout,
}

impl TestLibrary {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let layout = LibraryLayout::new(dir.path());
        let library = Self { dir, layout };
        library.write(SENSOR_FILE, SENSOR_RESP);
        library.write(OTHER_SENSOR_FILE, OTHER_SENSOR_RESP);
        library.write(LOGGER_FILE, &logger_resp(40.0));
        library.write(FAST_LOGGER_FILE, &logger_resp(100.0));
        library
    }

    pub fn with_broken_file(self) -> Self {
        self.write(BROKEN_FILE, BROKEN_RESP);
        self
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create library dir");
        }
        std::fs::write(&path, content).expect("Failed to write library file");
        path
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }
}

/// Write `content` into `dir` and return its path
pub fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}
