//! Consistency check and repair
//!
//! A check run has two phases that never overlap:
//!
//! - `ConsistencyScanner` walks a read-only store handle and produces a
//!   `ScanReport` with one `Classification` per record.
//! - `RepairEngine` consumes the report, quarantines every non-valid record
//!   and deletes it through its own read-write handle.
//!
//! No lock spans the two phases. The repair re-fetches each record by key
//! and skips keys that have disappeared in between.

mod adapters;
mod classification;
mod config;
mod errors;
mod outcome;
mod progress;
mod quarantine;
mod repair;
mod report;
mod scanner;

pub use classification::{
    Classification, RecordKey, RepairTarget, ScanReport, TargetKind, KEY_WIDTH,
};
pub use config::{CheckConfig, DEFAULT_DB_PATH, QUARANTINE_DIR};
pub use errors::{CheckError, CheckResult, Phase, RepairFailure, RepairStage};
pub use outcome::{
    CheckOutcome, EXIT_CLEAN, EXIT_FATAL, EXIT_REPAIRED, EXIT_REPAIR_ABORTED, EXIT_UNREPAIRED,
};
pub use progress::{percent, ProgressMeter};
pub use quarantine::{Quarantine, QuarantineEntry, DUMP_PREFIX, MANIFEST_FILE};
pub use repair::{RepairEngine, RepairSummary, StoreRepair};
pub use report::{CheckReporter, SilentReporter, TextReporter};
pub use scanner::{ConsistencyScanner, RawRecord, RecordCursor, StoreScan};
