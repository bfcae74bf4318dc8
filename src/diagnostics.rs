//! Diagnostic sink handed to the engines.
//!
//! Non-fatal findings (unknown namespaces, xsi:type mismatches, unknown
//! units, multiple library matches) are reported through a [`Diagnostics`]
//! value instead of being printed, so callers decide where they go.

use std::sync::Mutex;

/// Severity of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
}

/// Capability for reporting non-fatal conditions
pub trait Diagnostics: Send + Sync {
    fn emit(&self, severity: Severity, target: &str, message: &str);

    fn warn(&self, target: &str, message: &str) {
        self.emit(Severity::Warning, target, message);
    }

    fn info(&self, target: &str, message: &str) {
        self.emit(Severity::Info, target, message);
    }

    fn debug(&self, target: &str, message: &str) {
        self.emit(Severity::Debug, target, message);
    }
}

/// Forwards diagnostics to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn emit(&self, severity: Severity, target: &str, message: &str) {
        match severity {
            Severity::Debug => log::debug!(target: "stationxml_nrl", "[{}] {}", target, message),
            Severity::Info => log::info!(target: "stationxml_nrl", "[{}] {}", target, message),
            Severity::Warning => log::warn!(target: "stationxml_nrl", "[{}] {}", target, message),
        }
    }
}

/// A single recorded diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub severity: Severity,
    pub target: String,
    pub message: String,
}

/// Keeps every diagnostic in memory; used by tests and batch reports
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    records: Mutex<Vec<Record>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Record> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Warning messages in emission order
    pub fn warnings(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.severity == Severity::Warning)
            .map(|r| r.message)
            .collect()
    }

    pub fn has_warning_containing(&self, needle: &str) -> bool {
        self.warnings().iter().any(|w| w.contains(needle))
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn emit(&self, severity: Severity, target: &str, message: &str) {
        let record = Record {
            severity,
            target: target.to_string(),
            message: message.to_string(),
        };
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}
