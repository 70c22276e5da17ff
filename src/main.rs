//! pkgdbck entry point
//!
//! This is a minimal entrypoint that:
//! 1. Delegates argument parsing, scanning and repair to `cli::run`
//! 2. Prints setup errors to stderr
//! 3. Exits with the outcome's exit code
//!
//! All logic is delegated to the CLI module.

use pkgdbck::check::EXIT_FATAL;
use pkgdbck::cli;

fn main() {
    match cli::run() {
        Ok(outcome) => std::process::exit(outcome.exit_code()),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(EXIT_FATAL);
        }
    }
}
