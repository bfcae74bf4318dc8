use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use super::LibraryLayout;
use crate::error::{LibraryError, LibraryResult};
use crate::file_discovery::FileDiscovery;
use crate::resp::{Blockette, DECIMATION, parse_resp_file};

/// Output sample rate of a datalogger file: input rate over decimation
/// factor of the last decimation blockette, or 0 when there is none
pub fn final_rate(blockettes: &[Blockette]) -> f64 {
    blockettes
        .iter()
        .rev()
        .find(|b| b.kind() == DECIMATION)
        .and_then(|b| {
            let rate = b.number("04")?;
            let factor = b.number("05")?;
            (factor != 0.0).then(|| rate / factor)
        })
        .unwrap_or(0.0)
}

/// Final sample rate of every datalogger file, keyed by path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleRateIndex {
    rates: BTreeMap<PathBuf, f64>,
}

impl SampleRateIndex {
    /// Parse `files` in parallel. Files that fail to parse are logged and
    /// left out of the index.
    pub fn build(files: &[PathBuf]) -> Self {
        let rates = files
            .par_iter()
            .filter_map(|path| match parse_resp_file(path) {
                Ok(blockettes) => Some((path.clone(), final_rate(&blockettes))),
                Err(e) => {
                    log::warn!("skipping {} in rate index: {}", path.display(), e);
                    None
                }
            })
            .collect();
        Self { rates }
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, rate: f64) {
        self.rates.insert(path.into(), rate);
    }

    pub fn rate_for(&self, path: &Path) -> Option<f64> {
        self.rates.get(path).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, f64)> {
        self.rates.iter().map(|(p, r)| (p.as_path(), *r))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Write `<rate> <path>` lines sorted by path
    pub fn write(&self, path: &Path) -> LibraryResult<()> {
        let mut out = BufWriter::new(fs::File::create(path)?);
        for (file, rate) in &self.rates {
            writeln!(out, "{} {}", rate, file.display())?;
        }
        out.flush()?;
        log::info!("wrote {} index entries to {}", self.rates.len(), path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> LibraryResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LibraryError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                LibraryError::Io(e)
            }
        })?;

        let mut rates = BTreeMap::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let malformed = || LibraryError::MalformedIndexLine {
                file: path.to_path_buf(),
                line_number: i + 1,
                line: line.to_string(),
            };
            let (rate, file) = line.split_once(' ').ok_or_else(malformed)?;
            let rate: f64 = rate.parse().map_err(|_| malformed())?;
            if file.is_empty() {
                return Err(malformed());
            }
            rates.insert(PathBuf::from(file), rate);
        }
        Ok(Self { rates })
    }
}

/// Discover the datalogger files of a library and index them
pub async fn build_library_index(
    layout: &LibraryLayout,
    discovery: &FileDiscovery,
) -> LibraryResult<SampleRateIndex> {
    let files = discovery.discover_files(&layout.dataloggers).await?;
    log::info!("indexing {} datalogger files", files.len());

    tokio::task::spawn_blocking(move || SampleRateIndex::build(&files))
        .await
        .map_err(|e| LibraryError::Concurrency {
            details: format!("Task join error: {}", e),
        })
}
