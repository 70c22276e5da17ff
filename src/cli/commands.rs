//! CLI command implementation
//!
//! A run follows a fixed sequence:
//!
//! 1. Load the optional config file and apply flag overrides
//! 2. Install logging
//! 3. Scan the store read-only and print the damage summary
//! 4. Unless check-only or clean, repair through a fresh read-write handle
//!
//! Setup failures come back as `CliError`. Everything else, including an
//! aborted repair, is a `CheckOutcome`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::check::{
    CheckConfig, CheckOutcome, CheckReporter, ConsistencyScanner, RepairEngine, TextReporter,
};
use crate::observability::{init_logging, Event, LogSettings};
use crate::storage::STORE_FILE;

use super::args::Cli;
use super::errors::{CliError, CliResult};
use super::io::{write_fixing, write_json_summary, write_scan_summary};

/// Configuration file structure
///
/// Every field is optional; command line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,

    #[serde(default)]
    pub db_path: Option<PathBuf>,

    #[serde(default)]
    pub check_only: Option<bool>,

    /// `EnvFilter` directive used when no `-v`/`--quiet` flag is given
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub json_logs: bool,
}

impl FileConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let config: FileConfig = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if let Some(db_path) = &self.db_path {
            if db_path.as_os_str().is_empty() {
                return Err(CliError::config_error("db_path must not be empty"));
            }
        }

        if let Some(level) = &self.log_level {
            EnvFilter::try_new(level).map_err(|e| {
                CliError::config_error(format!("Invalid log_level '{}': {}", level, e))
            })?;
        }

        Ok(())
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub check: CheckConfig,
    pub log: LogSettings,
    /// Print the final summary as JSON instead of text
    pub json: bool,
}

impl Settings {
    /// Merges defaults, the config file (if any) and flags, in that order.
    pub fn resolve(cli: &Cli) -> CliResult<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let mut check = CheckConfig::default();
        if let Some(db_path) = cli.db_path.clone().or(file.db_path) {
            check.db_path = db_path;
        }
        check.root = cli.root.clone().or(file.root);
        check.check_only = cli.check_only || file.check_only.unwrap_or(false);

        let json_logs = cli.json_logs || file.json_logs;
        let log = match file.log_level {
            Some(level) if cli.verbose == 0 && !cli.quiet => LogSettings {
                level,
                json: json_logs,
            },
            _ => LogSettings::from_verbosity(cli.verbose, cli.quiet, json_logs),
        };

        Ok(Self {
            check,
            log,
            json: cli.json,
        })
    }
}

/// Parses arguments, runs the check and returns its outcome.
pub fn run() -> CliResult<CheckOutcome> {
    let cli = Cli::parse_args();
    let settings = Settings::resolve(&cli)?;

    if let Err(e) = init_logging(&settings.log) {
        eprintln!("{}", e);
    }
    if let Some(path) = &cli.config {
        tracing::debug!(
            event = Event::ConfigLoaded.as_str(),
            path = %path.display(),
            "configuration loaded"
        );
    }

    let label = settings.check.store_file().display().to_string();
    let mut reporter = reporter_for(settings.json, label, io::stderr(), io::stdout());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(&settings, &mut *reporter, &mut out)
}

/// Builds the reporter for one run.
///
/// With `json` set, stdout carries only the summary object and repair
/// actions are written to `diagnostics` instead.
pub fn reporter_for<D, O>(
    json: bool,
    label: String,
    diagnostics: D,
    stdout: O,
) -> Box<dyn CheckReporter>
where
    D: Write + 'static,
    O: Write + 'static,
{
    if json {
        Box::new(TextReporter::diagnostics_only(label, diagnostics))
    } else {
        Box::new(TextReporter::new(label, diagnostics, stdout))
    }
}

/// Runs scan and, when needed, repair with the given sinks.
///
/// `out` receives the summary; `reporter` receives progress, diagnostics and
/// repair actions.
pub fn execute<R, W>(settings: &Settings, reporter: &mut R, out: &mut W) -> CliResult<CheckOutcome>
where
    R: CheckReporter + ?Sized,
    W: Write,
{
    let config = &settings.check;
    let report = ConsistencyScanner::new(config).scan(reporter)?;
    let total_estimate = report.total_estimate();

    if !settings.json {
        write_scan_summary(out, &report)?;
    }

    let outcome = if report.is_clean() || config.check_only {
        CheckOutcome::from_scan(&report)
    } else {
        if !settings.json {
            write_fixing(out)?;
        }
        let visited = report.visited();
        let damaged = report.damaged_count();

        match RepairEngine::new(config).repair(report, reporter) {
            Ok(summary) => CheckOutcome::repaired(visited, damaged, &summary),
            Err(e) if e.is_setup_failure() => return Err(e.into()),
            Err(e) => {
                if !settings.json {
                    writeln!(out, "repair aborted: {}", e)?;
                }
                CheckOutcome::aborted(visited, damaged, &e)
            }
        }
    };

    if settings.json {
        let store = config.store_dir().join(STORE_FILE);
        write_json_summary(
            out,
            &store.display().to_string(),
            total_estimate,
            config.check_only,
            &outcome,
        )?;
    }

    Ok(outcome)
}
