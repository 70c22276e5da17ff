//! Check and repair error types
//!
//! Setup failures abort before any record is classified. Repair failures
//! abort the repair at the first record that could not be quarantined or
//! removed and carry that record's identity.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::storage::StorageError;

/// Phase a cancellation interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scan,
    Repair,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Scan => write!(f, "scan"),
            Phase::Repair => write!(f, "repair"),
        }
    }
}

/// Step of a single record's repair that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStage {
    Fetch,
    Quarantine,
    Delete,
}

impl fmt::Display for RepairStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairStage::Fetch => write!(f, "fetch"),
            RepairStage::Quarantine => write!(f, "quarantine"),
            RepairStage::Delete => write!(f, "delete"),
        }
    }
}

/// Underlying cause of a repair abort
#[derive(Debug, Error)]
pub enum RepairFailure {
    #[error(transparent)]
    Store(#[from] StorageError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("cannot open store at {}: {source}", .path.display())]
    StoreOpen {
        path: PathBuf,
        #[source]
        source: StorageError,
    },

    #[error("cannot query record count: {0}")]
    RecordCount(#[source] StorageError),

    #[error("cannot open cursor: {0}")]
    CursorOpen(#[source] StorageError),

    #[error("cursor read failed after {visited} records: {source}")]
    CursorRead {
        visited: u64,
        #[source]
        source: StorageError,
    },

    #[error("cannot prepare quarantine directory {}: {source}", .path.display())]
    QuarantineSetup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "repair aborted at record {index} (key {key}, instance {instance}) during {stage} \
         after {repaired} records repaired: {source}"
    )]
    RepairAborted {
        index: u64,
        key: String,
        instance: u32,
        stage: RepairStage,
        repaired: u64,
        #[source]
        source: RepairFailure,
    },

    #[error("{phase} cancelled after {processed} records")]
    Cancelled { phase: Phase, processed: u64 },
}

impl CheckError {
    /// Whether the error happened before any record was classified or touched
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            CheckError::StoreOpen { .. }
                | CheckError::RecordCount(_)
                | CheckError::CursorOpen(_)
                | CheckError::QuarantineSetup { .. }
        )
    }

    /// Scan index of the record a repair stopped at, if any
    pub fn aborted_at(&self) -> Option<u64> {
        match self {
            CheckError::RepairAborted { index, .. } => Some(*index),
            _ => None,
        }
    }
}

pub type CheckResult<T> = Result<T, CheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_failures() {
        assert!(CheckError::RecordCount(StorageError::data_corruption("x")).is_setup_failure());
        assert!(!CheckError::Cancelled {
            phase: Phase::Scan,
            processed: 3
        }
        .is_setup_failure());
    }

    #[test]
    fn test_repair_aborted_display_names_record() {
        let err = CheckError::RepairAborted {
            index: 1,
            key: "00000007[4]".to_string(),
            instance: 7,
            stage: RepairStage::Delete,
            repaired: 1,
            source: RepairFailure::Store(StorageError::not_found(&[0, 0, 0, 7])),
        };

        let display = err.to_string();
        assert!(display.contains("record 1"));
        assert!(display.contains("instance 7"));
        assert!(display.contains("during delete"));
        assert_eq!(err.aborted_at(), Some(1));
    }
}
