//! One channel against one manufacturer directory of the library, with
//! a verdict for every file instead of only the matches.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::LibraryLayout;
use crate::equivalence::{ResponseView, are_similar_logger, are_similar_sensor};
use crate::error::{LibraryError, LibraryResult, RespResult};
use crate::file_discovery::FileDiscovery;
use crate::resp::parse_resp_file;

/// Which half of the library a file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryPart {
    Sensor,
    Logger,
}

/// Verdict for one library file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileCheck {
    pub part: LibraryPart,
    pub path: PathBuf,
    pub matched: bool,
    /// Why the file does not match, or why it could not be read
    pub reason: String,
}

/// Library subdirectories to compare a channel with, relative to
/// `sensors/` and `dataloggers/`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckDirs {
    pub sensor_dir: Option<String>,
    pub logger_dir: Option<String>,
}

fn check_file(part: LibraryPart, response: &ResponseView, path: &Path) -> FileCheck {
    let compared: RespResult<_> = parse_resp_file(path).and_then(|blockettes| match part {
        LibraryPart::Sensor => are_similar_sensor(response, &blockettes),
        LibraryPart::Logger => are_similar_logger(response, &blockettes),
    });
    let (matched, reason) = match compared {
        Ok(result) => (result.matched, result.reason),
        Err(e) => (false, e.to_string()),
    };
    FileCheck {
        part,
        path: path.to_path_buf(),
        matched,
        reason,
    }
}

/// Compare `response` with every library file under the given
/// subdirectories, sensors first. Files that fail to parse are reported
/// as mismatches.
pub async fn check_channel(
    layout: &LibraryLayout,
    response: &ResponseView,
    dirs: &CheckDirs,
    discovery: &FileDiscovery,
) -> LibraryResult<Vec<FileCheck>> {
    let mut work = Vec::new();
    if let Some(dir) = &dirs.sensor_dir {
        for path in discovery.discover_files(&layout.sensors.join(dir)).await? {
            work.push((LibraryPart::Sensor, path));
        }
    }
    if let Some(dir) = &dirs.logger_dir {
        for path in discovery.discover_files(&layout.dataloggers.join(dir)).await? {
            work.push((LibraryPart::Logger, path));
        }
    }
    log::info!("checking {} library files", work.len());

    let response = response.clone();
    tokio::task::spawn_blocking(move || {
        work.iter()
            .map(|(part, path)| check_file(*part, &response, path))
            .collect()
    })
    .await
    .map_err(|e| LibraryError::Concurrency {
        details: format!("Task join error: {}", e),
    })
}
