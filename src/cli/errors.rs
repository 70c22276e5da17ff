//! CLI-specific error types
//!
//! All CLI errors are FATAL: the process exits with the setup error code.

use std::fmt;
use std::io;

use crate::check::CheckError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file missing, unreadable or invalid
    ConfigError,
    /// I/O error writing output
    IoError,
    /// Store or quarantine could not be set up, or the scan failed
    SetupFailed,
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "PKGDB_CLI_CONFIG_ERROR",
            Self::IoError => "PKGDB_CLI_IO_ERROR",
            Self::SetupFailed => "PKGDB_CLI_SETUP_FAILED",
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn setup_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::SetupFailed, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<CheckError> for CliError {
    fn from(e: CheckError) -> Self {
        Self::setup_failed(e.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    #[test]
    fn test_display_carries_code() {
        let err = CliError::config_error("db_path must not be empty");
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
        assert_eq!(
            err.to_string(),
            "PKGDB_CLI_CONFIG_ERROR: db_path must not be empty"
        );
    }

    #[test]
    fn test_check_error_becomes_setup_failure() {
        let err: CliError = CheckError::CursorOpen(StorageError::data_corruption("x")).into();
        assert_eq!(err.code_str(), "PKGDB_CLI_SETUP_FAILED");
        assert!(err.message().contains("cannot open cursor"));
    }
}
