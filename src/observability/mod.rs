//! Observability subsystem for pkgdbck
//!
//! Structured logging through `tracing`. Log output goes to stderr and is
//! independent of the progress and diagnostic report stream.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on check or repair
//! 3. No background threads
//!
//! # Usage
//!
//! ```ignore
//! use pkgdbck::observability::{init_logging, Event, LogSettings};
//!
//! init_logging(&LogSettings::from_verbosity(1, false, false))?;
//! tracing::info!(event = Event::ScanStart.as_str(), "scanning store");
//! ```

mod events;

pub use events::Event;

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt as tracing_fmt, prelude::*, EnvFilter};

/// Default filter when neither `RUST_LOG` nor a verbosity flag is given
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Observability error code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservabilityErrorCode {
    /// Logging could not be installed
    PkgdbObservabilityFailed,
}

impl ObservabilityErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservabilityErrorCode::PkgdbObservabilityFailed => "PKGDB_OBSERVABILITY_FAILED",
        }
    }
}

impl fmt::Display for ObservabilityErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observability error
///
/// Logging failure must never stop a check; callers report it and carry on.
#[derive(Debug)]
pub struct ObservabilityError {
    code: ObservabilityErrorCode,
    message: String,
}

impl ObservabilityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: ObservabilityErrorCode::PkgdbObservabilityFailed,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ObservabilityErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Observability errors are never fatal
    pub fn is_fatal(&self) -> bool {
        false
    }
}

impl fmt::Display for ObservabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ObservabilityError {}

pub type ObservabilityResult<T> = Result<T, ObservabilityError>;

/// How log output is filtered and formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `info` or `pkgdbck=debug`
    pub level: String,
    /// One JSON object per line instead of human-readable text
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            json: false,
        }
    }
}

impl LogSettings {
    /// Maps `-v` counts and `--quiet` to a filter level.
    pub fn from_verbosity(verbose: u8, quiet: bool, json: bool) -> Self {
        let level = if quiet {
            "error"
        } else {
            match verbose {
                0 => DEFAULT_LOG_LEVEL,
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        };
        Self {
            level: level.to_string(),
            json,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides `settings.level`.
pub fn init_logging(settings: &LogSettings) -> ObservabilityResult<()> {
    let subscriber = tracing_subscriber::registry().with(settings.filter());

    if settings.json {
        let json_layer = tracing_fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_current_span(true)
            .with_target(true);

        subscriber
            .with(json_layer)
            .try_init()
            .map_err(|e| ObservabilityError::new(e.to_string()))
    } else {
        let text_layer = tracing_fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(false)
            .with_target(false);

        subscriber
            .with(text_layer)
            .try_init()
            .map_err(|e| ObservabilityError::new(e.to_string()))
    }
}
