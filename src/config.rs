use crate::binding::Dialect;
use crate::cli::{Cli, Command, OutputFormat};
use crate::error::LibraryResult;
use crate::file_discovery::{FileDiscovery, RESP_PREFIX};
use crate::library::{INDEX_FILE, LibraryLayout, MatchKind};
use crate::rewrite::DEFAULT_URL_PREFIX;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix of the environment variables that override configuration
pub const ENV_PREFIX: &str = "STATIONXML_NRL_";

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub matching: MatchingConfig,
    pub parsing: ParsingConfig,
    pub validator: ValidatorConfig,
    pub output: OutputConfig,
}

/// Reference library location and references
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root directory holding `sensors/` and `dataloggers/`
    pub root: Option<PathBuf>,
    /// Prefix of library file references written by `link`
    pub url_prefix: String,
    /// Sample-rate index, relative to the root unless absolute
    pub index_file: PathBuf,
    /// Prune datalogger candidates with the index
    pub use_rate_index: bool,
    /// File name prefixes of library response files
    pub file_prefixes: Vec<String>,
    /// Glob patterns a library file must match (any of)
    pub include: Vec<String>,
    /// Glob patterns that drop a library file
    pub exclude: Vec<String>,
    /// Directory levels below `sensors/` and `dataloggers/` to descend
    pub max_depth: Option<usize>,
    pub follow_symlinks: bool,
}

/// Library scan settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchingConfig {
    /// Number of concurrent comparisons
    pub threads: Option<usize>,
    pub kind: MatchKind,
    /// Warn when a channel matches more than one library file
    pub multiple_match_warning: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ParsingConfig {
    pub dialect: Dialect,
    /// Report validation failures as warnings
    pub ignore_warnings: bool,
}

/// External schema validator run before parsing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Argument vector with `{schema}` and `{document}` placeholders
    pub command: Vec<String>,
    pub schema: Option<PathBuf>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormatConfig,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (errors only)
    pub quiet: bool,
}

/// Output format configuration (serializable version of CLI OutputFormat)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    #[default]
    Human,
    Json,
}

impl From<OutputFormat> for OutputFormatConfig {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputFormatConfig::Human,
            OutputFormat::Json => OutputFormatConfig::Json,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: None,
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
            index_file: PathBuf::from(INDEX_FILE),
            use_rate_index: true,
            file_prefixes: vec![RESP_PREFIX.to_string()],
            include: Vec::new(),
            exclude: Vec::new(),
            max_depth: None,
            follow_symlinks: false,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threads: None,
            kind: MatchKind::Both,
            multiple_match_warning: true,
        }
    }
}

fn split_patterns(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_env<T: std::str::FromStr>(env: &impl EnvProvider, name: &str) -> Result<Option<T>> {
    let key = format!("{}{}", ENV_PREFIX, name);
    match env.get(&key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value))),
        None => Ok(None),
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(&SystemEnvProvider, cli).await
    }

    pub async fn load_config_with(env: &impl EnvProvider, cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            config = Self::load_from_file(config_path).await?;
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = found_config;
        }

        config = Self::apply_environment_overrides_with(env, config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "stationxml-nrl.toml",
            "stationxml-nrl.json",
            ".stationxml-nrl.toml",
            ".stationxml-nrl.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                log::debug!("using configuration {}", path.display());
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("stationxml-nrl");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    log::debug!("using configuration {}", path.display());
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(root) = env.get(&format!("{}NRL", ENV_PREFIX)) {
            config.library.root = Some(PathBuf::from(root));
        }
        if let Some(prefix) = env.get(&format!("{}URL_PREFIX", ENV_PREFIX)) {
            config.library.url_prefix = prefix;
        }
        if let Some(index) = env.get(&format!("{}INDEX_FILE", ENV_PREFIX)) {
            config.library.index_file = PathBuf::from(index);
        }
        if let Some(use_index) = parse_env(env, "USE_RATE_INDEX")? {
            config.library.use_rate_index = use_index;
        }
        if let Some(prefixes) = env.get(&format!("{}FILE_PREFIXES", ENV_PREFIX)) {
            config.library.file_prefixes = split_patterns(&prefixes);
        }
        if let Some(include) = env.get(&format!("{}INCLUDE", ENV_PREFIX)) {
            config.library.include = split_patterns(&include);
        }
        if let Some(exclude) = env.get(&format!("{}EXCLUDE", ENV_PREFIX)) {
            config.library.exclude = split_patterns(&exclude);
        }
        if let Some(depth) = parse_env(env, "MAX_DEPTH")? {
            config.library.max_depth = Some(depth);
        }
        if let Some(follow) = parse_env(env, "FOLLOW_SYMLINKS")? {
            config.library.follow_symlinks = follow;
        }

        if let Some(threads) = parse_env(env, "THREADS")? {
            config.matching.threads = Some(threads);
        }
        if let Some(kind) = env.get(&format!("{}KIND", ENV_PREFIX)) {
            config.matching.kind = match kind.to_lowercase().as_str() {
                "sensor" => MatchKind::Sensor,
                "logger" => MatchKind::Logger,
                "both" => MatchKind::Both,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid {}KIND value: {}",
                        ENV_PREFIX, kind
                    )));
                }
            };
        }

        if let Some(dialect) = parse_env(env, "DIALECT")? {
            config.parsing.dialect = dialect;
        }
        if let Some(ignore) = parse_env(env, "IGNORE_WARNINGS")? {
            config.parsing.ignore_warnings = ignore;
        }

        if let Some(command) = env.get(&format!("{}VALIDATOR", ENV_PREFIX)) {
            config.validator.command = command.split_whitespace().map(str::to_string).collect();
        }
        if let Some(schema) = env.get(&format!("{}SCHEMA", ENV_PREFIX)) {
            config.validator.schema = Some(PathBuf::from(schema));
        }

        if let Some(verbose) = parse_env(env, "VERBOSE")? {
            config.output.verbose = verbose;
        }
        if let Some(quiet) = parse_env(env, "QUIET")? {
            config.output.quiet = quiet;
        }
        if let Some(format) = env.get(&format!("{}FORMAT", ENV_PREFIX)) {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormatConfig::Human,
                "json" => OutputFormatConfig::Json,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid {}FORMAT value: {}",
                        ENV_PREFIX, format
                    )));
                }
            };
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence).
    /// Only options actually given on the command line override.
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        let library = cli.library_args();
        if let Some(root) = library.nrl {
            config.library.root = Some(root);
        }
        if let Some(index) = library.index_file {
            config.library.index_file = index;
        }
        // patterns given on the command line add to the configured ones
        config.library.include.extend(library.include);
        config.library.exclude.extend(library.exclude);
        if let Some(depth) = library.max_depth {
            config.library.max_depth = Some(depth);
        }
        if library.follow_symlinks {
            config.library.follow_symlinks = true;
        }

        let parse = cli.parse_args_of();
        if let Some(dialect) = parse.dialect {
            config.parsing.dialect = dialect;
        }
        if parse.ignore_warnings {
            config.parsing.ignore_warnings = true;
        }

        if let Some(threads) = cli.threads() {
            config.matching.threads = Some(threads);
        }
        match &cli.command {
            Command::Check {
                kind,
                no_rate_index,
                ..
            } => {
                if let Some(kind) = kind {
                    config.matching.kind = *kind;
                }
                if *no_rate_index {
                    config.library.use_rate_index = false;
                }
            }
            Command::Link {
                url_prefix: Some(prefix),
                ..
            } => {
                config.library.url_prefix = prefix.clone();
            }
            Command::Convert {
                parse, url_prefix, ..
            } => {
                // conversion reads plain StationXML unless told otherwise
                if parse.dialect.is_none() {
                    config.parsing.dialect = Dialect::Fdsn;
                }
                if let Some(prefix) = url_prefix {
                    config.library.url_prefix = prefix.clone();
                }
            }
            _ => {}
        }

        if let Some(format) = cli.output_format {
            config.output.format = format.into();
        }
        if cli.verbose || cli.debug {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        config
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if let Some(threads) = config.matching.threads {
            if threads == 0 {
                return Err(ConfigError::Validation(
                    "Number of threads must be greater than 0".to_string(),
                ));
            }
            if threads > 1000 {
                return Err(ConfigError::Validation(
                    "Number of threads cannot exceed 1000".to_string(),
                ));
            }
        }

        if config.library.url_prefix.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Library URL prefix cannot be empty".to_string(),
            ));
        }

        if config.library.index_file.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "Index file name cannot be empty".to_string(),
            ));
        }

        if config.library.file_prefixes.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "At least one library file prefix is required".to_string(),
            ));
        }
        Self::file_discovery(config).map_err(|e| ConfigError::Validation(e.to_string()))?;

        if !config.validator.command.is_empty() && config.validator.schema.is_none() {
            return Err(ConfigError::Validation(
                "A validator command needs a schema file".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the effective thread count
    pub fn get_thread_count(config: &Config) -> usize {
        config.matching.threads.unwrap_or_else(num_cpus::get)
    }

    /// Discovery of library response files per the `[library]` settings
    pub fn file_discovery(config: &Config) -> LibraryResult<FileDiscovery> {
        let library = &config.library;
        Ok(FileDiscovery::new()
            .with_prefixes(library.file_prefixes.clone())
            .with_include_patterns(library.include.clone())?
            .with_exclude_patterns(library.exclude.clone())?
            .with_max_depth(library.max_depth)
            .with_follow_symlinks(library.follow_symlinks))
    }

    /// Library layout, if a root is configured
    pub fn library_layout(config: &Config) -> Option<LibraryLayout> {
        config
            .library
            .root
            .as_ref()
            .map(|root| LibraryLayout::new(root).with_index_file(&config.library.index_file))
    }
}
