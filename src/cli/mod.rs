//! CLI module for pkgdbck
//!
//! Parses flags, merges them with the optional config file, installs
//! logging and drives one scan (and repair) of the store.

mod args;
mod commands;
mod errors;
mod io;

pub use args::Cli;
pub use commands::{execute, reporter_for, run, FileConfig, Settings};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{damage_percent, write_json_summary, write_scan_summary};
