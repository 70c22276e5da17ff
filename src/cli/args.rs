//! CLI argument definitions using clap
//!
//! pkgdbck [--root PATH] [--dbpath PATH] [--checkonly] [--config FILE]
//!         [--json] [--json-logs] [-v...] [--quiet]
//!
//! Positional arguments are rejected.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// pkgdbck - check and repair a package-metadata store
#[derive(Parser, Debug, Default, Clone, PartialEq, Eq)]
#[command(name = "pkgdbck")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Alternate filesystem root the store path is resolved beneath
    #[arg(long, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Store directory (default: /var/lib/rpm)
    #[arg(long = "dbpath", value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Report damage without repairing it
    #[arg(long = "checkonly")]
    pub check_only: bool,

    /// JSON configuration file; command line flags override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the final summary as one JSON object on stdout
    #[arg(long)]
    pub json: bool,

    /// Emit log records as JSON lines on stderr
    #[arg(long)]
    pub json_logs: bool,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
