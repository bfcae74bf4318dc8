//! Concurrent matching of inventory channels against library files.
//!
//! - **Async orchestration**: one tokio task per candidate file, bounded by
//!   a semaphore
//! - **Blocking work**: RESP parsing and comparison run in `spawn_blocking`
//! - **Read-only snapshot**: channel responses are extracted into views
//!   before the scan, so tasks never touch the document

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures::future::try_join_all;
use serde::Serialize;
use tokio::sync::Semaphore;

use super::{LibraryLayout, MatchKind, SampleRateIndex};
use crate::binding::{BoundObject, channels};
use crate::diagnostics::Diagnostics;
use crate::equivalence::{
    DEFAULT_TOLERANCE, EquivalenceResult, ResponseView, StageAlignment, are_similar_logger,
    are_similar_sensor, check_float_equal,
};
use crate::error::{LibraryError, LibraryResult, RespResult};
use crate::file_discovery::FileDiscovery;
use crate::resp::{Blockette, parse_resp_file};

const TARGET: &str = "library";

/// Coarse cancellation of a running scan. Files already being compared
/// finish; no new file is started once the flag is set.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A library file whose response matched a channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryMatch {
    pub path: PathBuf,
    pub alignment: StageAlignment,
}

/// Matches per channel key plus scan statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchReport {
    pub sensor: BTreeMap<String, Vec<LibraryMatch>>,
    pub logger: BTreeMap<String, Vec<LibraryMatch>>,
    pub files_scanned: usize,
    pub files_pruned: usize,
    pub parse_errors: usize,
    pub cancelled: bool,
}

impl MatchReport {
    pub fn first_sensor(&self, key: &str) -> Option<&LibraryMatch> {
        self.sensor.get(key).and_then(|m| m.first())
    }

    pub fn first_logger(&self, key: &str) -> Option<&LibraryMatch> {
        self.logger.get(key).and_then(|m| m.first())
    }

    /// Channel keys with more than one match of either kind
    pub fn multiple_matches(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .sensor
            .iter()
            .chain(&self.logger)
            .filter(|(_, m)| m.len() > 1)
            .map(|(k, _)| k.as_str())
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }
}

/// Scan tuning
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub kind: MatchKind,
    pub max_concurrent: usize,
    pub multiple_match_warning: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            kind: MatchKind::Both,
            max_concurrent: num_cpus::get(),
            multiple_match_warning: true,
        }
    }
}

/// Channel data the scan needs, copied out of the document
#[derive(Debug, Clone)]
struct ChannelTarget {
    key: String,
    sample_rate: Option<f64>,
    response: ResponseView,
}

type Matcher = fn(&ResponseView, &[Blockette]) -> RespResult<EquivalenceResult>;

enum FileOutcome {
    Compared(Vec<(String, LibraryMatch)>),
    Failed,
    Skipped,
}

fn channel_targets(root: &BoundObject, diagnostics: &dyn Diagnostics) -> Vec<ChannelTarget> {
    channels(root)
        .into_iter()
        .filter_map(|c| {
            let key = c.key();
            let Some(response) = c.response() else {
                diagnostics.debug(TARGET, &format!("{} has no Response", key));
                return None;
            };
            Some(ChannelTarget {
                sample_rate: c.channel.object("SampleRate").and_then(BoundObject::value_of),
                response: ResponseView::from_object(response),
                key,
            })
        })
        .collect()
}

/// Parse one file and compare it with the selected channels
fn compare_file(
    path: &Path,
    targets: &[ChannelTarget],
    selected: &[usize],
    matcher: Matcher,
) -> RespResult<Vec<(String, LibraryMatch)>> {
    let blockettes = parse_resp_file(path)?;
    let mut matches = Vec::new();
    for &i in selected {
        let target = &targets[i];
        let result = matcher(&target.response, &blockettes)?;
        if result.matched
            && let Some(alignment) = result.alignment
        {
            log::debug!("{} matches {}", target.key, path.display());
            matches.push((
                target.key.clone(),
                LibraryMatch {
                    path: path.to_path_buf(),
                    alignment,
                },
            ));
        }
    }
    Ok(matches)
}

/// Matches channels of a document against a response library
pub struct LibraryScanner {
    layout: LibraryLayout,
    options: ScanOptions,
    index: Option<Arc<SampleRateIndex>>,
    discovery: FileDiscovery,
    cancel: CancellationFlag,
}

impl LibraryScanner {
    pub fn new(layout: LibraryLayout, options: ScanOptions) -> Self {
        Self {
            layout,
            options,
            index: None,
            discovery: FileDiscovery::new(),
            cancel: CancellationFlag::new(),
        }
    }

    /// Prune datalogger candidates whose indexed rate differs from the
    /// channel sample rate
    pub fn with_index(mut self, index: SampleRateIndex) -> Self {
        self.index = Some(Arc::new(index));
        self
    }

    pub fn with_discovery(mut self, discovery: FileDiscovery) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    pub fn layout(&self) -> &LibraryLayout {
        &self.layout
    }

    /// Compare every channel with a response against the library
    pub async fn scan(
        &self,
        root: &BoundObject,
        diagnostics: &dyn Diagnostics,
    ) -> LibraryResult<MatchReport> {
        let targets = Arc::new(channel_targets(root, diagnostics));
        let mut report = MatchReport::default();
        if targets.is_empty() {
            diagnostics.warn(TARGET, "no channel with a Response to match");
            return Ok(report);
        }

        if self.options.kind.includes_sensors() {
            let files = self.discovery.discover_files(&self.layout.sensors).await?;
            let all: Vec<usize> = (0..targets.len()).collect();
            let candidates = files.into_iter().map(|f| (f, all.clone())).collect();
            let sensor = self
                .run(candidates, &targets, are_similar_sensor, &mut report)
                .await?;
            report.sensor = sensor;
        }

        if self.options.kind.includes_loggers() {
            let files = self
                .discovery
                .discover_files(&self.layout.dataloggers)
                .await?;
            let mut candidates = Vec::with_capacity(files.len());
            for file in files {
                let selected = self.logger_candidates(&file, &targets);
                if selected.is_empty() {
                    report.files_pruned += 1;
                } else {
                    candidates.push((file, selected));
                }
            }
            let logger = self
                .run(candidates, &targets, are_similar_logger, &mut report)
                .await?;
            report.logger = logger;
        }

        report.cancelled = self.cancel.is_cancelled();
        if report.cancelled {
            diagnostics.warn(TARGET, "library scan cancelled, results are partial");
        }
        if self.options.multiple_match_warning {
            for key in report.multiple_matches() {
                diagnostics.warn(TARGET, &format!("MultipleMatch {}", key));
            }
        }
        log::info!(
            "scanned {} files ({} pruned, {} parse errors)",
            report.files_scanned,
            report.files_pruned,
            report.parse_errors
        );
        Ok(report)
    }

    /// Channels worth comparing with a datalogger file. Files missing from
    /// the index, and channels without a sample rate, are never pruned.
    fn logger_candidates(&self, file: &Path, targets: &[ChannelTarget]) -> Vec<usize> {
        let rate = self.index.as_ref().and_then(|index| index.rate_for(file));
        targets
            .iter()
            .enumerate()
            .filter(|(_, t)| match (t.sample_rate, rate) {
                (Some(channel_rate), Some(file_rate)) => {
                    check_float_equal("SampleRate", channel_rate, file_rate, DEFAULT_TOLERANCE)
                        .matched
                }
                _ => true,
            })
            .map(|(i, _)| i)
            .collect()
    }

    async fn run(
        &self,
        candidates: Vec<(PathBuf, Vec<usize>)>,
        targets: &Arc<Vec<ChannelTarget>>,
        matcher: Matcher,
        report: &mut MatchReport,
    ) -> LibraryResult<BTreeMap<String, Vec<LibraryMatch>>> {
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent.max(1)));
        let failures = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = candidates
            .into_iter()
            .map(|(path, selected)| {
                let semaphore = Arc::clone(&semaphore);
                let targets = Arc::clone(targets);
                let failures = Arc::clone(&failures);
                let cancel = self.cancel.clone();

                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|_| {
                        LibraryError::Concurrency {
                            details: "Failed to acquire scan semaphore".to_string(),
                        }
                    })?;
                    if cancel.is_cancelled() {
                        return Ok(FileOutcome::Skipped);
                    }

                    let outcome = tokio::task::spawn_blocking(move || {
                        compare_file(&path, &targets, &selected, matcher).map_err(|e| (path, e))
                    })
                    .await
                    .map_err(|e| LibraryError::Concurrency {
                        details: format!("Task join error: {}", e),
                    })?;

                    Ok::<FileOutcome, LibraryError>(match outcome {
                        Ok(matches) => FileOutcome::Compared(matches),
                        Err((path, e)) => {
                            failures.fetch_add(1, Ordering::SeqCst);
                            log::warn!("no match for {}: {}", path.display(), e);
                            FileOutcome::Failed
                        }
                    })
                })
            })
            .collect();

        let outcomes = try_join_all(tasks)
            .await
            .map_err(|e| LibraryError::Concurrency {
                details: format!("Task join error: {}", e),
            })?;

        let mut merged: BTreeMap<String, Vec<LibraryMatch>> = BTreeMap::new();
        for outcome in outcomes {
            match outcome? {
                FileOutcome::Compared(matches) => {
                    report.files_scanned += 1;
                    for (key, m) in matches {
                        merged.entry(key).or_default().push(m);
                    }
                }
                FileOutcome::Failed => report.files_scanned += 1,
                FileOutcome::Skipped => {}
            }
        }
        report.parse_errors += failures.load(Ordering::SeqCst);

        for matches in merged.values_mut() {
            matches.sort_by(|a, b| a.path.cmp(&b.path));
        }
        Ok(merged)
    }
}
