use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Top-level error type covering every engine of the crate
#[derive(Error, Debug)]
pub enum NrlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),

    #[error("RESP error: {0}")]
    Resp(#[from] RespError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema validator error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Schema validation failed for {file}: {diagnostics}")]
    SchemaGate { file: PathBuf, diagnostics: String },

    #[error("Channel not found: {key}")]
    ChannelNotFound { key: String },
}

/// XML binding failures (build, validate, export)
#[derive(Error, Debug)]
pub enum BindingError {
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Unknown element {field} under {path}")]
    UnknownField { field: String, path: String },

    #[error("Expected datatype {kind}. Received invalid value '{value}' in {path}")]
    InvalidFormat {
        kind: &'static str,
        value: String,
        path: String,
    },

    #[error("Missing required element or attribute or value: \"{type_name}{field}\"")]
    MissingRequiredField { type_name: String, field: String },

    #[error("{type_name}: {message}")]
    DomainRule { type_name: String, message: String },

    #[error("Unexpected root element {found}, expected FDSNStationXML")]
    UnexpectedRoot { found: String },

    #[error("Field {field} of {type_name} cannot hold {found}")]
    TypeMismatch {
        type_name: String,
        field: String,
        found: String,
    },

    #[error("Unexpected attribute {name}={value} in {path}")]
    UnexpectedAttribute {
        name: String,
        value: String,
        path: String,
    },

    #[error("Operation requires an ExtStationXML document, found {found}")]
    DialectMismatch { found: String },

    #[error("Write error: {0}")]
    Write(String),
}

/// RESP text format failures
#[derive(Error, Debug)]
pub enum RespError {
    #[error("IO error reading {file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no pattern match at {file}:{line_number}: {line}")]
    MalformedLine {
        file: PathBuf,
        line_number: usize,
        line: String,
    },

    #[error("unknown blockette type: {code}")]
    UnknownBlocketteType { code: String },

    #[error("invalid value '{value}' for B{blockette}F{field} in {file}")]
    InvalidField {
        file: PathBuf,
        blockette: String,
        field: String,
        value: String,
    },

    #[error("can only append rows to list fields: B{blockette}F{field} in {file}")]
    ConflictingField {
        file: PathBuf,
        blockette: String,
        field: String,
    },
}

/// Reference library failures
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Library path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Malformed index line {line_number} in {file}: {line}")]
    MalformedIndexLine {
        file: PathBuf,
        line_number: usize,
        line: String,
    },

    #[error("Concurrent scan error: {details}")]
    Concurrency { details: String },

    #[error("Invalid pattern: {details}")]
    Pattern { details: String },
}

/// External validator process failures
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("error calling validator {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("validator command is empty")]
    EmptyCommand,
}

impl From<ConfigError> for NrlError {
    fn from(err: ConfigError) -> Self {
        NrlError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, NrlError>;

/// Binding result type alias
pub type BindingResult<T> = std::result::Result<T, BindingError>;

/// RESP result type alias
pub type RespResult<T> = std::result::Result<T, RespError>;

/// Library result type alias
pub type LibraryResult<T> = std::result::Result<T, LibraryError>;
