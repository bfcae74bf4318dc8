//! External schema validation gate.
//!
//! Full XML-schema validation of extended documents is delegated to an
//! outside program. The program prints `0` when the document is valid and
//! its diagnostics otherwise.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use crate::error::OracleError;

/// Placeholder replaced by the schema file in a command template
pub const SCHEMA_PLACEHOLDER: &str = "{schema}";
/// Placeholder replaced by the document in a command template
pub const DOCUMENT_PLACEHOLDER: &str = "{document}";

/// Outcome of an external validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleVerdict {
    pub passed: bool,
    pub diagnostics: String,
}

impl OracleVerdict {
    pub fn pass() -> Self {
        Self {
            passed: true,
            diagnostics: String::new(),
        }
    }

    pub fn fail(diagnostics: impl Into<String>) -> Self {
        Self {
            passed: false,
            diagnostics: diagnostics.into(),
        }
    }

    /// Interpret validator output: trimmed `0` passes
    pub fn from_output(output: &str) -> Self {
        let trimmed = output.trim();
        if trimmed == "0" {
            Self::pass()
        } else {
            Self::fail(trimmed)
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait SchemaOracle: Send + Sync {
    fn check(&self, document: &Path, schema: &Path) -> Result<OracleVerdict, OracleError>;
}

/// Runs a validator program built from an argv template
#[derive(Debug, Clone)]
pub struct CommandOracle {
    argv: Vec<String>,
}

impl CommandOracle {
    pub fn new(argv: Vec<String>) -> Result<Self, OracleError> {
        if argv.is_empty() || argv[0].trim().is_empty() {
            return Err(OracleError::EmptyCommand);
        }
        Ok(Self { argv })
    }

    /// Template arguments with placeholders substituted
    pub fn arguments(&self, document: &Path, schema: &Path) -> Vec<String> {
        let document = document.display().to_string();
        let schema = schema.display().to_string();
        self.argv
            .iter()
            .map(|arg| {
                arg.replace(SCHEMA_PLACEHOLDER, &schema)
                    .replace(DOCUMENT_PLACEHOLDER, &document)
            })
            .collect()
    }
}

impl SchemaOracle for CommandOracle {
    fn check(&self, document: &Path, schema: &Path) -> Result<OracleVerdict, OracleError> {
        let args = self.arguments(document, schema);
        let program = &args[0];
        log::debug!("running validator: {}", args.join(" "));

        let output = Command::new(program)
            .args(&args[1..])
            .output()
            .map_err(|source| OracleError::Launch {
                program: program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut verdict = OracleVerdict::from_output(&stdout);
        if !output.status.success() && verdict.passed {
            verdict = OracleVerdict::fail(format!("validator exited with {}", output.status));
        }
        if !verdict.passed {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                verdict.diagnostics = format!("{}\n{}", verdict.diagnostics, stderr.trim());
            }
        }
        Ok(verdict)
    }
}

/// A document and the schema it must satisfy, checked before parsing
pub struct SchemaGate<'a> {
    oracle: &'a dyn SchemaOracle,
    schema: PathBuf,
}

impl<'a> SchemaGate<'a> {
    pub fn new(oracle: &'a dyn SchemaOracle, schema: impl Into<PathBuf>) -> Self {
        Self {
            oracle,
            schema: schema.into(),
        }
    }

    /// Fails with [`crate::NrlError::SchemaGate`] when the document is rejected
    pub fn admit(&self, document: &Path) -> crate::Result<()> {
        let verdict = self.oracle.check(document, &self.schema)?;
        if verdict.passed {
            log::info!("{} passed schema validation", document.display());
            Ok(())
        } else {
            Err(crate::NrlError::SchemaGate {
                file: document.to_path_buf(),
                diagnostics: verdict.diagnostics,
            })
        }
    }
}
