//! Repair engine
//!
//! Drains a scan report in two passes:
//!
//! 1. Damaged records, ascending scan index
//! 2. Malformed-key records, most recently discovered first
//!
//! Each record is re-fetched by its exact key, durably dumped to the
//! quarantine directory, then deleted. A key that is already gone is skipped.
//! Any other failure stops the repair at that record; records after it are
//! neither dumped nor deleted.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::observability::Event;
use crate::storage::{PackageStore, StorageResult};

use super::classification::{RepairTarget, ScanReport};
use super::config::CheckConfig;
use super::errors::{CheckError, CheckResult, Phase, RepairFailure, RepairStage};
use super::quarantine::Quarantine;
use super::report::CheckReporter;

/// Write access the repair engine needs from a store handle
pub trait StoreRepair {
    /// Current value under `key`, `Ok(None)` when absent.
    fn fetch(&mut self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    fn remove(&mut self, key: &[u8]) -> StorageResult<()>;
}

/// Counts for a repair that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairSummary {
    /// Records dumped and deleted
    pub quarantined: u64,
    /// Records already absent when repair reached them
    pub skipped: u64,
    /// Dump files written, in processing order
    pub files: Vec<PathBuf>,
}

pub struct RepairEngine {
    store_dir: PathBuf,
    quarantine_dir: PathBuf,
    run_id: Uuid,
    cancel: Option<Arc<AtomicBool>>,
}

impl RepairEngine {
    pub fn new(config: &CheckConfig) -> Self {
        Self {
            store_dir: config.store_dir(),
            quarantine_dir: config.quarantine_dir(),
            run_id: Uuid::new_v4(),
            cancel: None,
        }
    }

    /// Stops the repair between records once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Opens the configured store read-write and repairs it.
    pub fn repair<R: CheckReporter + ?Sized>(
        &self,
        report: ScanReport,
        reporter: &mut R,
    ) -> CheckResult<RepairSummary> {
        let mut store =
            PackageStore::open_read_write(&self.store_dir).map_err(|source| {
                tracing::error!(
                    event = Event::StoreOpenFailed.as_str(),
                    path = %self.store_dir.display(),
                    error = %source,
                    "cannot open store for repair"
                );
                CheckError::StoreOpen {
                    path: self.store_dir.clone(),
                    source,
                }
            })?;

        self.repair_store(&mut store, report, reporter)
    }

    /// Repairs through an already opened store handle.
    pub fn repair_store<S, R>(
        &self,
        store: &mut S,
        report: ScanReport,
        reporter: &mut R,
    ) -> CheckResult<RepairSummary>
    where
        S: StoreRepair + ?Sized,
        R: CheckReporter + ?Sized,
    {
        let quarantine = Quarantine::prepare(&self.quarantine_dir, self.run_id).map_err(
            |source| CheckError::QuarantineSetup {
                path: self.quarantine_dir.clone(),
                source,
            },
        )?;

        let (damaged, malformed) = report.into_repair_queues();
        tracing::info!(
            event = Event::RepairStart.as_str(),
            run_id = %self.run_id,
            damaged = damaged.len(),
            malformed_keys = malformed.len(),
            quarantine = %self.quarantine_dir.display(),
            "repairing store"
        );

        let mut summary = RepairSummary::default();
        for target in damaged.into_iter().chain(malformed) {
            if self.is_cancelled() {
                let processed = summary.quarantined + summary.skipped;
                tracing::warn!(
                    event = Event::RepairCancelled.as_str(),
                    processed,
                    "repair cancelled"
                );
                return Err(CheckError::Cancelled {
                    phase: Phase::Repair,
                    processed,
                });
            }

            self.repair_one(store, &quarantine, target, reporter, &mut summary)?;
        }

        tracing::info!(
            event = Event::RepairComplete.as_str(),
            run_id = %self.run_id,
            quarantined = summary.quarantined,
            skipped = summary.skipped,
            "repair complete"
        );

        Ok(summary)
    }

    fn repair_one<S, R>(
        &self,
        store: &mut S,
        quarantine: &Quarantine,
        target: RepairTarget,
        reporter: &mut R,
        summary: &mut RepairSummary,
    ) -> CheckResult<()>
    where
        S: StoreRepair + ?Sized,
        R: CheckReporter + ?Sized,
    {
        reporter.repairing(&target);

        let value = match store.fetch(target.key.as_bytes()) {
            Ok(Some(value)) => value,
            Ok(None) => {
                tracing::info!(
                    event = Event::RecordAlreadyRemoved.as_str(),
                    index = target.index,
                    key = %target.key,
                    "key already removed, skipping"
                );
                reporter.already_removed(&target);
                summary.skipped += 1;
                return Ok(());
            }
            Err(e) => return Err(abort(&target, RepairStage::Fetch, summary, e.into())),
        };

        let path = quarantine.dump(&target, &value).map_err(|source| {
            let failure = RepairFailure::Io {
                context: format!("dump to {}", quarantine.dir().display()),
                source,
            };
            abort(&target, RepairStage::Quarantine, summary, failure)
        })?;
        tracing::info!(
            event = Event::RecordQuarantined.as_str(),
            index = target.index,
            key = %target.key,
            bytes = value.len(),
            path = %path.display(),
            "record quarantined"
        );
        reporter.quarantined(&target, &path, value.len());

        store
            .remove(target.key.as_bytes())
            .map_err(|e| abort(&target, RepairStage::Delete, summary, e.into()))?;
        tracing::info!(
            event = Event::RecordDeleted.as_str(),
            index = target.index,
            key = %target.key,
            "record deleted"
        );
        reporter.deleted(&target);

        summary.quarantined += 1;
        summary.files.push(path);
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}

fn abort(
    target: &RepairTarget,
    stage: RepairStage,
    summary: &RepairSummary,
    source: RepairFailure,
) -> CheckError {
    tracing::error!(
        event = Event::RepairAborted.as_str(),
        index = target.index,
        key = %target.key,
        stage = %stage,
        error = %source,
        "repair aborted"
    );
    CheckError::RepairAborted {
        index: target.index,
        key: target.key.to_string(),
        instance: target.instance,
        stage,
        repaired: summary.quarantined,
        source,
    }
}
