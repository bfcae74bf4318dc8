use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};

use stationxml_nrl::binding::{
    BoundObject, ValidationMode, channels, export_dict, export_xml, find_channel, parse_file,
    write_file,
};
use stationxml_nrl::cli::{Cli, Command, ExportFormat, VerbosityLevel, parse_unit_assignments};
use stationxml_nrl::config::{Config, ConfigManager};
use stationxml_nrl::convert::{ConvertOptions, convert_to_extended};
use stationxml_nrl::diagnostics::LogDiagnostics;
use stationxml_nrl::equivalence::{ResponseView, compare_channels, unique_responses};
use stationxml_nrl::error::LibraryError;
use stationxml_nrl::library::{
    CheckDirs, LibraryLayout, LibraryScanner, MatchKind, MatchReport, SampleRateIndex,
    ScanOptions, build_library_index, check_channel,
};
use stationxml_nrl::oracle::{CommandOracle, SchemaGate};
use stationxml_nrl::output::Output;
use stationxml_nrl::rewrite::{add_unity_responses, link_library_responses, parse_input_units};
use stationxml_nrl::units::clean_unit_names;

fn verbosity(cli: &Cli, config: &Config) -> VerbosityLevel {
    if config.output.quiet {
        VerbosityLevel::Quiet
    } else if cli.debug {
        VerbosityLevel::Debug
    } else if config.output.verbose {
        VerbosityLevel::Verbose
    } else {
        VerbosityLevel::Normal
    }
}

fn validation_mode(config: &Config) -> ValidationMode {
    ValidationMode::from_ignore_warnings(config.parsing.ignore_warnings)
}

/// Run the external validator when one is configured, then bind the file
fn load_document(path: &Path, config: &Config) -> Result<BoundObject> {
    if !config.validator.command.is_empty() {
        let oracle = CommandOracle::new(config.validator.command.clone())?;
        let schema = config
            .validator
            .schema
            .clone()
            .ok_or_else(|| anyhow!("validator configured without a schema"))?;
        SchemaGate::new(&oracle, schema).admit(path)?;
    }
    let root = parse_file(path, config.parsing.dialect, validation_mode(config), &LogDiagnostics)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(root)
}

fn write_document(root: &BoundObject, output: Option<&PathBuf>, config: &Config) -> Result<()> {
    let mode = validation_mode(config);
    match output {
        Some(path) => write_file(root, path, mode, &LogDiagnostics)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let stdout = std::io::stdout();
            export_xml(root, stdout.lock(), mode, &LogDiagnostics)?;
            Ok(())
        }
    }
}

/// Reports go to stdout unless the document itself is written there
fn print_report(report: &str, document_on_stdout: bool) {
    if document_on_stdout {
        eprint!("{}", report);
    } else {
        print!("{}", report);
    }
}

fn library_layout(config: &Config) -> Result<LibraryLayout> {
    ConfigManager::library_layout(config)
        .ok_or_else(|| anyhow!("No NRL root configured; use --nrl or [library] root"))
}

fn load_index(layout: &LibraryLayout) -> Result<Option<SampleRateIndex>> {
    match SampleRateIndex::load(&layout.index_file) {
        Ok(index) => {
            log::info!("loaded {} index entries", index.len());
            Ok(Some(index))
        }
        Err(LibraryError::NotFound { path }) => {
            log::warn!(
                "no sample-rate index at {}, comparing every datalogger file",
                path.display()
            );
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

async fn scan_library(
    root: &BoundObject,
    layout: &LibraryLayout,
    config: &Config,
    kind: MatchKind,
) -> Result<MatchReport> {
    let options = ScanOptions {
        kind,
        max_concurrent: ConfigManager::get_thread_count(config),
        multiple_match_warning: config.matching.multiple_match_warning,
    };
    let mut scanner = LibraryScanner::new(layout.clone(), options)
        .with_discovery(ConfigManager::file_discovery(config)?);
    if config.library.use_rate_index
        && kind.includes_loggers()
        && let Some(index) = load_index(layout)?
    {
        scanner = scanner.with_index(index);
    }

    let cancel = scanner.cancellation();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupted, finishing files in progress");
            cancel.cancel();
        }
    });
    let report = scanner.scan(root, &LogDiagnostics).await;
    interrupt.abort();
    Ok(report?)
}

async fn run(cli: &Cli, config: &Config, output: &Output) -> Result<()> {
    match &cli.command {
        Command::Parse {
            file,
            to,
            output: out,
            ..
        } => {
            let root = load_document(file, config)?;
            match to {
                ExportFormat::Xml => write_document(&root, out.as_ref(), config)?,
                ExportFormat::Json => {
                    let value = export_dict(&root, validation_mode(config), &LogDiagnostics)?;
                    let text = serde_json::to_string_pretty(&value)?;
                    match out {
                        Some(path) => std::fs::write(path, text + "\n")
                            .with_context(|| format!("Failed to write {}", path.display()))?,
                        None => {
                            let mut stdout = std::io::stdout().lock();
                            writeln!(stdout, "{}", text)?;
                        }
                    }
                }
            }
        }
        Command::Channels { file, .. } => {
            let root = load_document(file, config)?;
            let keys: Vec<String> = channels(&root).iter().map(|c| c.key()).collect();
            print!("{}", output.format_channels(&keys));
        }
        Command::Check { file, .. } => {
            let root = load_document(file, config)?;
            let layout = library_layout(config)?;
            let report = scan_library(&root, &layout, config, config.matching.kind).await?;
            let keys: Vec<String> = channels(&root).iter().map(|c| c.key()).collect();
            print!("{}", output.format_match_report(&keys, &report, &layout));
        }
        Command::Index { .. } => {
            let layout = library_layout(config)?;
            let discovery = ConfigManager::file_discovery(config)?;
            let index = build_library_index(&layout, &discovery).await?;
            index.write(&layout.index_file)?;
            print!("{}", output.format_index(index.len(), &layout.index_file));
        }
        Command::Uniq { file, .. } => {
            let root = load_document(file, config)?;
            let groups = unique_responses(&root, &LogDiagnostics);
            print!("{}", output.format_groups(&groups));
        }
        Command::Compare {
            file, key_a, key_b, ..
        } => {
            let root = load_document(file, config)?;
            let result = compare_channels(&root, key_a, key_b)?;
            print!("{}", output.format_comparison(key_a, key_b, &result));
            if !result.matched {
                std::process::exit(1);
            }
        }
        Command::CleanUnits {
            file, output: out, ..
        } => {
            let mut root = load_document(file, config)?;
            let changes = clean_unit_names(&mut root, &LogDiagnostics);
            write_document(&root, out.as_ref(), config)?;
            print_report(&output.format_unit_changes(&changes), out.is_none());
        }
        Command::Soh {
            file,
            input_unit,
            input_units,
            output: out,
            ..
        } => {
            let mut units = BTreeMap::new();
            if let Some(path) = input_units {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                units.extend(parse_input_units(&text));
            }
            units.extend(parse_unit_assignments(input_unit).map_err(|e| anyhow!(e))?);

            let mut root = load_document(file, config)?;
            let summary = add_unity_responses(&mut root, &units, &LogDiagnostics)?;
            write_document(&root, out.as_ref(), config)?;
            print_report(
                &output.format_rewrite("Unity responses", &summary),
                out.is_none(),
            );
        }
        Command::Convert {
            file,
            link,
            delete_current,
            only_channels,
            namespace,
            output: out,
            ..
        } => {
            let root = load_document(file, config)?;
            let options = ConvertOptions {
                namespace: namespace.clone(),
                only_channels: only_channels.clone(),
                drop_current: *delete_current,
                ..ConvertOptions::default()
            };
            let (mut converted, summary) =
                convert_to_extended(&root, &options, &LogDiagnostics)?;
            let mut report = output.format_conversion(&summary);

            if *link {
                let layout = library_layout(config)?;
                let matches =
                    scan_library(&converted, &layout, config, MatchKind::Both).await?;
                if matches.cancelled {
                    bail!("Library scan was interrupted; nothing written");
                }
                let linked = link_library_responses(
                    &mut converted,
                    &matches,
                    &layout,
                    &config.library.url_prefix,
                    &LogDiagnostics,
                )?;
                report.push_str(&output.format_rewrite("Linked responses", &linked));
            } else {
                log::info!("skipping NRL match");
            }

            write_document(&converted, out.as_ref(), config)?;
            print_report(&report, out.is_none());
        }
        Command::CheckChannel {
            file,
            key,
            sensor_dir,
            logger_dir,
            ..
        } => {
            let root = load_document(file, config)?;
            let layout = library_layout(config)?;
            let channel =
                find_channel(&root, key).ok_or_else(|| anyhow!("No channel {}", key))?;
            let response = channel
                .response()
                .map(ResponseView::from_object)
                .ok_or_else(|| anyhow!("{} has no Response", key))?;
            let dirs = CheckDirs {
                sensor_dir: sensor_dir.clone(),
                logger_dir: logger_dir.clone(),
            };
            let discovery = ConfigManager::file_discovery(config)?;
            let checks = check_channel(&layout, &response, &dirs, &discovery).await?;
            print!("{}", output.format_channel_checks(key, &checks, &layout));
        }
        Command::Link {
            file, output: out, ..
        } => {
            let mut root = load_document(file, config)?;
            let layout = library_layout(config)?;
            let report = scan_library(&root, &layout, config, MatchKind::Both).await?;
            if report.cancelled {
                bail!("Library scan was interrupted; document left unchanged");
            }
            let summary = link_library_responses(
                &mut root,
                &report,
                &layout,
                &config.library.url_prefix,
                &LogDiagnostics,
            )?;
            write_document(&root, out.as_ref(), config)?;
            print_report(
                &output.format_rewrite("Linked responses", &summary),
                out.is_none(),
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    env_logger::Builder::new()
        .filter_level(cli.verbosity().log_filter())
        .parse_default_env()
        .init();

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        std::process::exit(2);
    }

    let config = ConfigManager::load_config(&cli)
        .await
        .context("Failed to load configuration")?;
    log::debug!("configuration: {:?}", config);

    let output = Output::new(verbosity(&cli, &config), config.output.format.into());
    run(&cli, &config, &output).await
}
