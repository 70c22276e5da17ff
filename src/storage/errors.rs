//! Store error types
//!
//! | Code                         | Severity |
//! |------------------------------|----------|
//! | `PKGDB_STORAGE_WRITE_FAILED` | ERROR    |
//! | `PKGDB_STORAGE_READ_FAILED`  | ERROR    |
//! | `PKGDB_KEY_NOT_FOUND`        | ERROR    |
//! | `PKGDB_STORE_READ_ONLY`      | ERROR    |
//! | `PKGDB_DATA_CORRUPTION`      | FATAL    |

use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The operation failed; the store itself is still usable
    Error,
    /// The log cannot be trusted past this point
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    PkgdbStorageWriteFailed,
    PkgdbStorageReadFailed,
    PkgdbKeyNotFound,
    PkgdbStoreReadOnly,
    /// Checksum or framing failure in the record log
    PkgdbDataCorruption,
}

impl StorageErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::PkgdbStorageWriteFailed => "PKGDB_STORAGE_WRITE_FAILED",
            StorageErrorCode::PkgdbStorageReadFailed => "PKGDB_STORAGE_READ_FAILED",
            StorageErrorCode::PkgdbKeyNotFound => "PKGDB_KEY_NOT_FOUND",
            StorageErrorCode::PkgdbStoreReadOnly => "PKGDB_STORE_READ_ONLY",
            StorageErrorCode::PkgdbDataCorruption => "PKGDB_DATA_CORRUPTION",
        }
    }

    pub fn severity(&self) -> Severity {
        if *self == StorageErrorCode::PkgdbDataCorruption {
            Severity::Fatal
        } else {
            Severity::Error
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Failure of a store operation.
///
/// `context` says where it happened (a key or a log offset) when that is
/// known; `source` keeps the underlying OS error for I/O failures.
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    context: Option<String>,
    source: Option<io::Error>,
}

impl StorageError {
    fn coded(code: StorageErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            source: None,
        }
    }

    fn with_context(mut self, context: String) -> Self {
        self.context = Some(context);
        self
    }

    fn caused_by(mut self, source: io::Error) -> Self {
        self.source = Some(source);
        self
    }

    pub fn write_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::coded(StorageErrorCode::PkgdbStorageWriteFailed, message).caused_by(source)
    }

    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::coded(StorageErrorCode::PkgdbStorageReadFailed, message).caused_by(source)
    }

    pub fn not_found(key: &[u8]) -> Self {
        let hex: String = key.iter().map(|b| format!("{:02x}", b)).collect();
        Self::coded(StorageErrorCode::PkgdbKeyNotFound, "no such key")
            .with_context(format!("key {}", hex))
    }

    pub fn read_only(operation: &str) -> Self {
        Self::coded(
            StorageErrorCode::PkgdbStoreReadOnly,
            format!("{} refused on a read-only handle", operation),
        )
    }

    /// Corruption with no known position.
    pub fn data_corruption(message: impl Into<String>) -> Self {
        Self::coded(StorageErrorCode::PkgdbDataCorruption, message)
    }

    /// Corruption in the log record starting at `offset`.
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self::data_corruption(reason).with_context(format!("log offset {}", offset))
    }

    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn is_fatal(&self) -> bool {
        self.code.severity() == Severity::Fatal
    }

    pub fn is_not_found(&self) -> bool {
        self.code == StorageErrorCode::PkgdbKeyNotFound
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code, self.message)?;
        if let Some(context) = &self.context {
            write!(f, " ({})", context)?;
        }
        match &self.source {
            Some(source) => write!(f, ": {}", source),
            None => Ok(()),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as _)
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_only_corruption_is_fatal() {
        assert!(StorageError::data_corruption("bad crc").is_fatal());
        assert!(!StorageError::not_found(&[0, 0, 0, 1]).is_fatal());
        assert!(!StorageError::read_only("delete").is_fatal());
        assert!(!StorageError::write_failed("append", io::Error::other("disk full")).is_fatal());
    }

    #[test]
    fn test_not_found_names_key() {
        let err = StorageError::not_found(&[0x00, 0x00, 0x01, 0x2c]);
        assert!(err.is_not_found());
        assert_eq!(err.context(), Some("key 0000012c"));
    }

    #[test]
    fn test_display_has_severity_code_and_offset() {
        let err = StorageError::corruption_at_offset(2048, "crc32 mismatch");
        assert_eq!(
            err.to_string(),
            "[FATAL] PKGDB_DATA_CORRUPTION: crc32 mismatch (log offset 2048)"
        );
    }

    #[test]
    fn test_io_source_is_chained() {
        let err = StorageError::read_failed("open", io::Error::other("EIO"));
        assert_eq!(err.code().code(), "PKGDB_STORAGE_READ_FAILED");
        assert!(err.source().is_some());
        assert!(err.to_string().ends_with(": EIO"));
    }
}
