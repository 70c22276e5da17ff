//! Final result of a check run and its process exit code

use serde::Serialize;

use super::classification::ScanReport;
use super::errors::CheckError;
use super::repair::RepairSummary;

/// Exit code: no damage found
pub const EXIT_CLEAN: i32 = 0;
/// Exit code: damage found, store left unrepaired
pub const EXIT_UNREPAIRED: i32 = 1;
/// Exit code: fatal setup or configuration error
pub const EXIT_FATAL: i32 = 2;
/// Exit code: repair aborted partway
pub const EXIT_REPAIR_ABORTED: i32 = 3;
/// Exit code: damage found and repaired
pub const EXIT_REPAIRED: i32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    Clean {
        visited: u64,
    },
    Unrepaired {
        visited: u64,
        damaged: u64,
    },
    Repaired {
        visited: u64,
        damaged: u64,
        quarantined: u64,
        skipped: u64,
    },
    RepairAborted {
        visited: u64,
        damaged: u64,
        /// Scan index of the record the repair stopped at, if one was reached
        #[serde(skip_serializing_if = "Option::is_none")]
        index: Option<u64>,
        error: String,
    },
}

impl CheckOutcome {
    /// Outcome of a scan that is not followed by a repair.
    pub fn from_scan(report: &ScanReport) -> Self {
        if report.is_clean() {
            CheckOutcome::Clean {
                visited: report.visited(),
            }
        } else {
            CheckOutcome::Unrepaired {
                visited: report.visited(),
                damaged: report.damaged_count(),
            }
        }
    }

    pub fn repaired(visited: u64, damaged: u64, summary: &RepairSummary) -> Self {
        CheckOutcome::Repaired {
            visited,
            damaged,
            quarantined: summary.quarantined,
            skipped: summary.skipped,
        }
    }

    pub fn aborted(visited: u64, damaged: u64, error: &CheckError) -> Self {
        CheckOutcome::RepairAborted {
            visited,
            damaged,
            index: error.aborted_at(),
            error: error.to_string(),
        }
    }

    pub fn visited(&self) -> u64 {
        match self {
            CheckOutcome::Clean { visited }
            | CheckOutcome::Unrepaired { visited, .. }
            | CheckOutcome::Repaired { visited, .. }
            | CheckOutcome::RepairAborted { visited, .. } => *visited,
        }
    }

    pub fn damaged(&self) -> u64 {
        match self {
            CheckOutcome::Clean { .. } => 0,
            CheckOutcome::Unrepaired { damaged, .. }
            | CheckOutcome::Repaired { damaged, .. }
            | CheckOutcome::RepairAborted { damaged, .. } => *damaged,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            CheckOutcome::Clean { .. } => EXIT_CLEAN,
            CheckOutcome::Unrepaired { .. } => EXIT_UNREPAIRED,
            CheckOutcome::Repaired { .. } => EXIT_REPAIRED,
            CheckOutcome::RepairAborted { .. } => EXIT_REPAIR_ABORTED,
        }
    }
}
