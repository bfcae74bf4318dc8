use clap::{Parser, Subcommand, ValueEnum};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::binding::Dialect;
use crate::library::MatchKind;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
    /// Show all available debugging information
    Debug,
}

impl VerbosityLevel {
    pub fn log_filter(self) -> log::LevelFilter {
        match self {
            VerbosityLevel::Quiet => log::LevelFilter::Error,
            VerbosityLevel::Normal => log::LevelFilter::Warn,
            VerbosityLevel::Verbose => log::LevelFilter::Info,
            VerbosityLevel::Debug => log::LevelFilter::Debug,
        }
    }
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Serialization of a parsed document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExportFormat {
    #[default]
    Xml,
    Json,
}

/// StationXML tools for the Nominal Response Library
#[derive(Parser, Debug, Clone)]
#[command(name = "stationxml-nrl")]
#[command(about = "Bind StationXML documents and match their responses against the NRL")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Show debugging information
    #[arg(long = "debug", global = true, conflicts_with = "quiet")]
    pub debug: bool,

    /// Configuration file (TOML or JSON)
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long = "format", value_enum, global = true)]
    pub output_format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Command,
}

/// Library options shared by the commands that read the NRL
#[derive(clap::Args, Debug, Clone, Default, PartialEq)]
pub struct LibraryArgs {
    /// Root directory of the NRL
    #[arg(long = "nrl")]
    pub nrl: Option<PathBuf>,

    /// Datalogger sample-rate index file
    #[arg(long = "index-file")]
    pub index_file: Option<PathBuf>,

    /// Only read library files matching this glob (repeatable)
    #[arg(long = "include", action = clap::ArgAction::Append)]
    pub include: Vec<String>,

    /// Skip library files matching this glob (repeatable)
    #[arg(long = "exclude", action = clap::ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Directory levels to descend below each library subtree
    #[arg(long = "max-depth")]
    pub max_depth: Option<usize>,

    /// Follow symbolic links inside the library
    #[arg(long = "follow-symlinks")]
    pub follow_symlinks: bool,
}

/// Document options shared by the commands that parse StationXML
#[derive(clap::Args, Debug, Clone, Default, PartialEq)]
pub struct ParseArgs {
    /// Root type to bind: ext or fdsn
    #[arg(long = "dialect")]
    pub dialect: Option<Dialect>,

    /// Report validation failures as warnings instead of failing
    #[arg(long = "ignore-warnings")]
    pub ignore_warnings: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Parse, validate and re-export a document
    Parse {
        file: PathBuf,
        #[command(flatten)]
        parse: ParseArgs,
        /// Serialization to write
        #[arg(long = "to", value_enum, default_value = "xml")]
        to: ExportFormat,
        /// Output file (stdout when omitted)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// List the channel keys of a document
    Channels {
        file: PathBuf,
        #[command(flatten)]
        parse: ParseArgs,
    },
    /// Find the NRL sensor and datalogger files matching each channel
    Check {
        file: PathBuf,
        #[command(flatten)]
        parse: ParseArgs,
        #[command(flatten)]
        library: LibraryArgs,
        /// Library subtrees to compare against
        #[arg(long = "kind", value_enum)]
        kind: Option<MatchKind>,
        /// Compare every datalogger file instead of pruning by sample rate
        #[arg(long = "no-rate-index")]
        no_rate_index: bool,
        /// Number of concurrent comparisons
        #[arg(short = 't', long = "threads")]
        threads: Option<usize>,
    },
    /// Build the datalogger sample-rate index
    Index {
        #[command(flatten)]
        library: LibraryArgs,
    },
    /// Group channels that share the same response
    Uniq {
        file: PathBuf,
        #[command(flatten)]
        parse: ParseArgs,
    },
    /// Compare the responses of two channels
    Compare {
        file: PathBuf,
        key_a: String,
        key_b: String,
        #[command(flatten)]
        parse: ParseArgs,
    },
    /// Normalize unit names throughout a document
    CleanUnits {
        file: PathBuf,
        #[command(flatten)]
        parse: ParseArgs,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Add unity responses to state-of-health channels
    Soh {
        file: PathBuf,
        #[command(flatten)]
        parse: ParseArgs,
        /// Input unit of a channel code, as CHAN=UNIT
        #[arg(long = "input-unit", action = clap::ArgAction::Append)]
        input_unit: Vec<String>,
        /// File of `CHAN,CHAN unit` lines
        #[arg(long = "input-units")]
        input_units: Option<PathBuf>,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Convert a StationXML document to ExtStationXML
    Convert {
        file: PathBuf,
        #[command(flatten)]
        parse: ParseArgs,
        #[command(flatten)]
        library: LibraryArgs,
        /// Also replace matched responses by references to NRL files
        #[arg(long = "link")]
        link: bool,
        /// Remove channels that are currently operating
        #[arg(long = "delete-current", alias = "delcurrent")]
        delete_current: bool,
        /// Keep channels whose code or LOC.CODE matches (empty LOC is `--`)
        #[arg(long = "only-channels", alias = "onlychan", value_parser = Regex::new)]
        only_channels: Option<Regex>,
        /// Source, Sender and SIS namespace of the converted document
        #[arg(long = "namespace")]
        namespace: Option<String>,
        /// Prefix of the library references
        #[arg(long = "url-prefix")]
        url_prefix: Option<String>,
        #[arg(short = 't', long = "threads")]
        threads: Option<usize>,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Compare one channel with every file of an NRL manufacturer directory
    CheckChannel {
        file: PathBuf,
        /// Channel key, NET.STA.LOC.CHAN_START
        key: String,
        #[command(flatten)]
        parse: ParseArgs,
        #[command(flatten)]
        library: LibraryArgs,
        /// Subdirectory of sensors/ to compare against
        #[arg(long = "sensor-dir", alias = "sensordir")]
        sensor_dir: Option<String>,
        /// Subdirectory of dataloggers/ to compare against
        #[arg(long = "logger-dir", alias = "loggerdir")]
        logger_dir: Option<String>,
    },
    /// Replace matched responses by references to NRL files
    Link {
        file: PathBuf,
        #[command(flatten)]
        parse: ParseArgs,
        #[command(flatten)]
        library: LibraryArgs,
        /// Prefix of the library references
        #[arg(long = "url-prefix")]
        url_prefix: Option<String>,
        #[arg(short = 't', long = "threads")]
        threads: Option<usize>,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.debug {
            VerbosityLevel::Debug
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// The document the command reads, if any
    pub fn document(&self) -> Option<&PathBuf> {
        match &self.command {
            Command::Parse { file, .. }
            | Command::Channels { file, .. }
            | Command::Check { file, .. }
            | Command::Uniq { file, .. }
            | Command::Compare { file, .. }
            | Command::CleanUnits { file, .. }
            | Command::Soh { file, .. }
            | Command::Convert { file, .. }
            | Command::CheckChannel { file, .. }
            | Command::Link { file, .. } => Some(file),
            Command::Index { .. } => None,
        }
    }

    pub fn parse_args_of(&self) -> ParseArgs {
        match &self.command {
            Command::Parse { parse, .. }
            | Command::Channels { parse, .. }
            | Command::Check { parse, .. }
            | Command::Uniq { parse, .. }
            | Command::Compare { parse, .. }
            | Command::CleanUnits { parse, .. }
            | Command::Soh { parse, .. }
            | Command::Convert { parse, .. }
            | Command::CheckChannel { parse, .. }
            | Command::Link { parse, .. } => parse.clone(),
            Command::Index { .. } => ParseArgs::default(),
        }
    }

    pub fn library_args(&self) -> LibraryArgs {
        match &self.command {
            Command::Check { library, .. }
            | Command::Index { library }
            | Command::Convert { library, .. }
            | Command::CheckChannel { library, .. }
            | Command::Link { library, .. } => library.clone(),
            _ => LibraryArgs::default(),
        }
    }

    pub fn threads(&self) -> Option<usize> {
        match &self.command {
            Command::Check { threads, .. }
            | Command::Convert { threads, .. }
            | Command::Link { threads, .. } => *threads,
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(file) = self.document()
            && !file.exists()
        {
            return Err(format!("Path does not exist: {}", file.display()));
        }
        if let Some(threads) = self.threads()
            && threads == 0
        {
            return Err("Number of threads must be greater than 0".to_string());
        }
        if let Command::CheckChannel {
            sensor_dir: None,
            logger_dir: None,
            ..
        } = &self.command
        {
            return Err("Give --sensor-dir, --logger-dir or both".to_string());
        }
        Ok(())
    }
}

/// Parse `CHAN=UNIT` arguments into a channel code to unit map
pub fn parse_unit_assignments(items: &[String]) -> Result<BTreeMap<String, String>, String> {
    items
        .iter()
        .map(|item| match item.split_once('=') {
            Some((chan, unit)) if !chan.trim().is_empty() && !unit.trim().is_empty() => {
                Ok((chan.trim().to_string(), unit.trim().to_string()))
            }
            _ => Err(format!("expected CHAN=UNIT, got '{}'", item)),
        })
        .collect()
}
