use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use tempfile::TempDir;

use stationxml_nrl::binding::Dialect;
use stationxml_nrl::cli::Cli;
use stationxml_nrl::config::{ConfigManager, EnvProvider, OutputFormatConfig};
use stationxml_nrl::library::MatchKind;

use crate::common::*;

#[derive(Default)]
struct FixedEnv(HashMap<String, String>);

impl FixedEnv {
    fn with(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }
}

impl EnvProvider for FixedEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

const CONFIG: &str = r#"
[library]
root = "/file/NRL"
url_prefix = "https://example.org/NRL"

[matching]
threads = 3
kind = "sensor"

[parsing]
dialect = "fdsn"
"#;

fn cli(temp: &TempDir, args: &[&str]) -> Cli {
    let config = write_fixture(temp.path(), "stationxml-nrl.toml", CONFIG);
    let mut argv = vec![
        "stationxml-nrl".to_string(),
        "--config".to_string(),
        config.display().to_string(),
    ];
    argv.extend(args.iter().map(|a| a.to_string()));
    Cli::try_parse_from(argv).unwrap()
}

#[tokio::test]
async fn test_file_values_survive_when_not_overridden() {
    let temp = TempDir::new().unwrap();
    let cli = cli(&temp, &["index"]);
    let config = ConfigManager::load_config_with(&FixedEnv::default(), &cli)
        .await
        .unwrap();

    assert_eq!(config.library.root, Some(PathBuf::from("/file/NRL")));
    assert_eq!(config.library.url_prefix, "https://example.org/NRL");
    assert_eq!(config.matching.threads, Some(3));
    assert_eq!(config.matching.kind, MatchKind::Sensor);
    assert_eq!(config.parsing.dialect, Dialect::Fdsn);
    // unspecified sections keep their defaults
    assert!(config.library.use_rate_index);
    assert_eq!(config.output.format, OutputFormatConfig::Human);
}

#[tokio::test]
async fn test_environment_then_command_line_take_precedence() {
    let temp = TempDir::new().unwrap();
    let env = FixedEnv::default()
        .with("STATIONXML_NRL_NRL", "/env/NRL")
        .with("STATIONXML_NRL_THREADS", "5")
        .with("STATIONXML_NRL_FORMAT", "json");
    let cli = cli(
        &temp,
        &["check", "inventory.xml", "--kind", "logger", "--threads", "7"],
    );
    let config = ConfigManager::load_config_with(&env, &cli).await.unwrap();

    assert_eq!(config.library.root, Some(PathBuf::from("/env/NRL")));
    assert_eq!(config.matching.threads, Some(7));
    assert_eq!(config.matching.kind, MatchKind::Logger);
    assert_eq!(config.output.format, OutputFormatConfig::Json);

    let layout = ConfigManager::library_layout(&config).unwrap();
    assert_eq!(layout.sensors, PathBuf::from("/env/NRL/sensors"));
    assert_eq!(ConfigManager::get_thread_count(&config), 7);
}

#[tokio::test]
async fn test_invalid_layered_configuration_is_rejected() {
    let temp = TempDir::new().unwrap();
    let env = FixedEnv::default().with("STATIONXML_NRL_VALIDATOR", "xmllint {document}");
    let cli = cli(&temp, &["index"]);
    let err = ConfigManager::load_config_with(&env, &cli).await.unwrap_err();
    assert!(err.to_string().contains("needs a schema"));
}
