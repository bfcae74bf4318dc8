//! Report formatting for the command line.
//!
//! Every report renders either as human-readable text, colorized when
//! stdout is a terminal, or as pretty-printed JSON.

use serde::Serialize;
use serde_json::json;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::convert::ConvertSummary;
use crate::equivalence::{CheckResult, ResponseGroup};
use crate::library::{FileCheck, LibraryLayout, LibraryMatch, MatchReport};
use crate::rewrite::RewriteSummary;
use crate::units::UnitChanges;

/// Output formatter for command reports
pub struct Output {
    verbosity: VerbosityLevel,
    format: OutputFormat,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel, format: OutputFormat) -> Self {
        Self {
            verbosity,
            format,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    /// Plain output, for tests and redirected streams
    pub fn without_colors(mut self) -> Self {
        self.show_colors = false;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
        match serde_json::to_string_pretty(value) {
            Ok(text) => text + "\n",
            Err(e) => format!("{{\"error\": \"{}\"}}\n", e),
        }
    }

    pub fn format_channels(&self, keys: &[String]) -> String {
        if self.format == OutputFormat::Json {
            return Self::to_json(keys);
        }
        let mut output = String::new();
        for key in keys {
            output.push_str(key);
            output.push('\n');
        }
        if self.verbosity >= VerbosityLevel::Verbose {
            output.push_str(&format!("{} channels\n", keys.len()));
        }
        output
    }

    fn format_matches(
        &self,
        output: &mut String,
        label: &str,
        matches: &[LibraryMatch],
        layout: &LibraryLayout,
    ) {
        for m in matches {
            output.push_str(&format!(
                "  {} {}",
                self.colorize(label, "32"),
                layout.relative(&m.path)
            ));
            if self.verbosity >= VerbosityLevel::Verbose {
                output.push_str(&format!(
                    " (stage {} = library stage {}",
                    m.alignment.document_stage, m.alignment.library_stage
                ));
                if let Some(last) = m.alignment.library_last_stage {
                    output.push_str(&format!("..{}", last));
                }
                output.push(')');
            }
            output.push('\n');
        }
    }

    /// One block per channel listing its sensor and datalogger matches
    pub fn format_match_report(
        &self,
        channel_keys: &[String],
        report: &MatchReport,
        layout: &LibraryLayout,
    ) -> String {
        if self.format == OutputFormat::Json {
            return Self::to_json(report);
        }

        let mut output = String::new();
        let mut unmatched = 0;
        for key in channel_keys {
            let sensor = report.sensor.get(key).map(Vec::as_slice).unwrap_or(&[]);
            let logger = report.logger.get(key).map(Vec::as_slice).unwrap_or(&[]);
            if sensor.is_empty() && logger.is_empty() {
                unmatched += 1;
                if self.verbosity >= VerbosityLevel::Verbose {
                    output.push_str(&format!("{} {}\n", key, self.colorize("no match", "33")));
                }
                continue;
            }
            if self.verbosity == VerbosityLevel::Quiet {
                continue;
            }
            output.push_str(&format!("{}\n", key));
            self.format_matches(&mut output, "sensor", sensor, layout);
            self.format_matches(&mut output, "logger", logger, layout);
        }

        output.push_str(&format!(
            "Scanned {} files, {} pruned, {} unreadable; {} channels without a match\n",
            report.files_scanned, report.files_pruned, report.parse_errors, unmatched
        ));
        if report.cancelled {
            output.push_str(&self.colorize("Scan cancelled, results are partial\n", "33"));
        }
        output
    }

    pub fn format_index(&self, entries: usize, index_file: &std::path::Path) -> String {
        if self.format == OutputFormat::Json {
            return Self::to_json(&json!({
                "entries": entries,
                "index_file": index_file.display().to_string(),
            }));
        }
        format!("Indexed {} datalogger files into {}\n", entries, index_file.display())
    }

    pub fn format_groups(&self, groups: &[ResponseGroup]) -> String {
        if self.format == OutputFormat::Json {
            return Self::to_json(groups);
        }
        let mut output = String::new();
        for group in groups {
            output.push_str(&format!("{}\n", self.colorize(&group.representative, "36")));
            for key in group.channels.iter().filter(|k| **k != group.representative) {
                output.push_str(&format!("  {}\n", key));
            }
        }
        output.push_str(&format!("{} unique responses\n", groups.len()));
        output
    }

    pub fn format_comparison(&self, key_a: &str, key_b: &str, result: &CheckResult) -> String {
        if self.format == OutputFormat::Json {
            return Self::to_json(&json!({
                "first": key_a,
                "second": key_b,
                "matched": result.matched,
                "reason": result.reason,
            }));
        }
        if result.matched {
            format!("{} {} {}\n", key_a, self.colorize("==", "32"), key_b)
        } else {
            format!(
                "{} {} {}: {}\n",
                key_a,
                self.colorize("!=", "31"),
                key_b,
                result.reason
            )
        }
    }

    pub fn format_unit_changes(&self, changes: &UnitChanges) -> String {
        if self.format == OutputFormat::Json {
            return Self::to_json(changes);
        }
        let mut output = format!("Changed {} unit names\n", changes.count);
        if self.verbosity >= VerbosityLevel::Verbose {
            for (old, new) in &changes.changes {
                output.push_str(&format!("  {} => {}\n", old, new));
            }
        }
        for unknown in &changes.unknown {
            output.push_str(&format!("  {} {}\n", self.colorize("unknown unit:", "33"), unknown));
        }
        output
    }

    pub fn format_rewrite(&self, title: &str, summary: &RewriteSummary) -> String {
        if self.format == OutputFormat::Json {
            return Self::to_json(summary);
        }
        let mut output = format!("{}: {} channels\n", title, summary.count);
        if self.verbosity >= VerbosityLevel::Normal {
            for (key, change) in &summary.changes {
                let change = if change.starts_with("WARN") {
                    self.colorize(change, "33")
                } else {
                    change.clone()
                };
                output.push_str(&format!("  {} => {}\n", key, change));
            }
        }
        output
    }

    pub fn format_conversion(&self, summary: &ConvertSummary) -> String {
        if self.format == OutputFormat::Json {
            return Self::to_json(summary);
        }
        let mut output = format!(
            "Converted {} channels, removed {}\n",
            summary.channels,
            summary.removed.len()
        );
        if self.verbosity >= VerbosityLevel::Verbose {
            for (key, reason) in &summary.removed {
                output.push_str(&format!("  {} => {}\n", key, reason));
            }
            for field in &summary.dropped_fields {
                output.push_str(&format!("  dropped {}\n", field));
            }
        }
        output
    }

    /// One `MATCH` or `FAIL` line per library file
    pub fn format_channel_checks(
        &self,
        key: &str,
        checks: &[FileCheck],
        layout: &LibraryLayout,
    ) -> String {
        if self.format == OutputFormat::Json {
            return Self::to_json(&json!({
                "channel": key,
                "files": checks,
            }));
        }
        let mut output = String::new();
        for check in checks {
            let file = layout.relative(&check.path);
            if check.matched {
                output.push_str(&format!("{} {} match {}\n", self.colorize("MATCH", "32"), key, file));
            } else {
                output.push_str(&format!(
                    "{} {} match {}: {}\n",
                    self.colorize("FAIL", "31"),
                    key,
                    file,
                    check.reason
                ));
            }
        }
        output
    }
}
