//! Consistency scanner
//!
//! Walks the store once, front to back, and classifies every record:
//!
//! 1. Query the approximate record count (progress display only)
//! 2. Open a forward cursor
//! 3. For each record: update progress, validate the header, check the key
//!    width, append the classification
//! 4. Release the cursor and the store handle
//!
//! Setup failures produce no report. A header that fails validation is never
//! fatal; it is classified and the scan moves on.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::header::{HeaderCheck, StructuralValidator};
use crate::observability::Event;
use crate::storage::{PackageStore, StorageResult};

use super::classification::{Classification, RecordKey, ScanReport};
use super::config::CheckConfig;
use super::errors::{CheckError, CheckResult, Phase};
use super::progress::ProgressMeter;
use super::report::CheckReporter;

/// A `(key, value)` pair read from the store
pub type RawRecord = (Vec<u8>, Vec<u8>);

/// Forward iteration over store records
pub trait RecordCursor {
    /// Returns `None` at end of store.
    fn next_record(&mut self) -> StorageResult<Option<RawRecord>>;
}

/// Read access the scanner needs from a store handle
pub trait StoreScan {
    type Cursor<'a>: RecordCursor
    where
        Self: 'a;

    fn approx_record_count(&mut self) -> StorageResult<u64>;

    fn open_cursor(&mut self) -> StorageResult<Self::Cursor<'_>>;
}

/// Classifies every record of a store.
pub struct ConsistencyScanner<V = StructuralValidator> {
    store_dir: PathBuf,
    validator: V,
    cancel: Option<Arc<AtomicBool>>,
}

impl ConsistencyScanner<StructuralValidator> {
    pub fn new(config: &CheckConfig) -> Self {
        Self::with_validator(config, StructuralValidator)
    }
}

impl<V: HeaderCheck> ConsistencyScanner<V> {
    pub fn with_validator(config: &CheckConfig, validator: V) -> Self {
        Self {
            store_dir: config.store_dir(),
            validator,
            cancel: None,
        }
    }

    /// Stops the scan between records once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Opens the configured store read-only and scans it.
    pub fn scan<R: CheckReporter + ?Sized>(&self, reporter: &mut R) -> CheckResult<ScanReport> {
        let mut store =
            PackageStore::open_read_only(&self.store_dir).map_err(|source| {
                tracing::error!(
                    event = Event::StoreOpenFailed.as_str(),
                    path = %self.store_dir.display(),
                    error = %source,
                    "cannot open store for scan"
                );
                CheckError::StoreOpen {
                    path: self.store_dir.clone(),
                    source,
                }
            })?;

        self.scan_store(&mut store, reporter)
    }

    /// Scans an already opened store handle.
    pub fn scan_store<S, R>(&self, store: &mut S, reporter: &mut R) -> CheckResult<ScanReport>
    where
        S: StoreScan,
        R: CheckReporter + ?Sized,
    {
        let total = store.approx_record_count().map_err(CheckError::RecordCount)?;
        let mut cursor = store.open_cursor().map_err(CheckError::CursorOpen)?;

        tracing::info!(
            event = Event::ScanStart.as_str(),
            store = %self.store_dir.display(),
            total,
            "scanning store"
        );

        let mut report = ScanReport::new(total);
        let mut meter = ProgressMeter::new(total);

        loop {
            if self.is_cancelled() {
                tracing::warn!(
                    event = Event::ScanCancelled.as_str(),
                    visited = report.visited(),
                    "scan cancelled"
                );
                return Err(CheckError::Cancelled {
                    phase: Phase::Scan,
                    processed: report.visited(),
                });
            }

            let (key, value) = match cursor.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(source) => {
                    return Err(CheckError::CursorRead {
                        visited: report.visited(),
                        source,
                    })
                }
            };

            let visited = report.visited() + 1;
            if let Some(pct) = meter.advance(visited) {
                reporter.progress(visited, total, pct);
            }

            let classification = self.classify(RecordKey::from(key), &value);
            let flagged = !classification.is_valid();
            let index = report.record(classification);

            if flagged {
                if let Some(entry) = report.get(index) {
                    log_flagged(index, entry);
                    reporter.flagged(index, entry);
                }
            }
        }

        reporter.scan_finished(&report);
        tracing::info!(
            event = Event::ScanComplete.as_str(),
            visited = report.visited(),
            damaged = report.damaged_count(),
            "scan complete"
        );

        Ok(report)
    }

    fn classify(&self, key: RecordKey, value: &[u8]) -> Classification {
        let verdict = self.validator.check(value);
        let instance = key.instance();

        if !verdict.is_valid() {
            return Classification::Damaged {
                key,
                instance,
                message: verdict
                    .message
                    .unwrap_or_else(|| "header failed validation".to_string()),
            };
        }

        if !key.is_standard() {
            return Classification::MalformedKey {
                key,
                instance,
                message: verdict.message,
            };
        }

        Classification::Valid
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}

fn log_flagged(index: u64, entry: &Classification) {
    match entry {
        Classification::Valid => {}
        Classification::Damaged {
            key,
            instance,
            message,
        } => tracing::warn!(
            event = Event::RecordDamaged.as_str(),
            index,
            instance,
            key = %key,
            message = %message,
            "damaged header"
        ),
        Classification::MalformedKey { key, instance, .. } => tracing::warn!(
            event = Event::RecordMalformedKey.as_str(),
            index,
            instance,
            key = %key,
            key_len = key.len(),
            "non-standard key width"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HeaderVerdict;
    use crate::storage::StorageError;

    struct MockStore {
        records: Vec<RawRecord>,
        estimate: u64,
        fail_count: bool,
        fail_cursor: bool,
        corrupt_at: Option<usize>,
    }

    impl MockStore {
        fn new(records: Vec<RawRecord>) -> Self {
            Self {
                estimate: records.len() as u64,
                records,
                fail_count: false,
                fail_cursor: false,
                corrupt_at: None,
            }
        }
    }

    struct MockCursor<'a> {
        store: &'a MockStore,
        position: usize,
    }

    impl RecordCursor for MockCursor<'_> {
        fn next_record(&mut self) -> StorageResult<Option<RawRecord>> {
            if self.store.corrupt_at == Some(self.position) {
                return Err(StorageError::corruption_at_offset(
                    self.position as u64,
                    "checksum mismatch",
                ));
            }
            let record = self.store.records.get(self.position).cloned();
            self.position += 1;
            Ok(record)
        }
    }

    impl StoreScan for MockStore {
        type Cursor<'a> = MockCursor<'a>;

        fn approx_record_count(&mut self) -> StorageResult<u64> {
            if self.fail_count {
                return Err(StorageError::data_corruption("no stats"));
            }
            Ok(self.estimate)
        }

        fn open_cursor(&mut self) -> StorageResult<MockCursor<'_>> {
            if self.fail_cursor {
                return Err(StorageError::read_failed(
                    "cursor",
                    std::io::Error::other("locked"),
                ));
            }
            Ok(MockCursor {
                store: self,
                position: 0,
            })
        }
    }

    #[derive(Default)]
    struct Recording {
        progress: Vec<u8>,
        flagged: Vec<u64>,
        finished: bool,
    }

    impl CheckReporter for Recording {
        fn progress(&mut self, _visited: u64, _total: u64, percent: u8) {
            self.progress.push(percent);
        }

        fn flagged(&mut self, index: u64, _classification: &Classification) {
            self.flagged.push(index);
        }

        fn scan_finished(&mut self, _report: &ScanReport) {
            self.finished = true;
        }
    }

    /// Values starting with `b"BAD"` fail validation.
    fn prefix_validator(blob: &[u8]) -> HeaderVerdict {
        if blob.starts_with(b"BAD") {
            HeaderVerdict::invalid("bad magic")
        } else {
            HeaderVerdict::valid()
        }
    }

    fn scanner() -> ConsistencyScanner<fn(&[u8]) -> HeaderVerdict> {
        ConsistencyScanner::with_validator(
            &CheckConfig::new("/unused"),
            prefix_validator as fn(&[u8]) -> HeaderVerdict,
        )
    }

    fn rec(key: &[u8], value: &[u8]) -> RawRecord {
        (key.to_vec(), value.to_vec())
    }

    #[test]
    fn test_classifies_each_shape() {
        let mut store = MockStore::new(vec![
            rec(&1u32.to_be_bytes(), b"ok"),
            rec(&2u32.to_be_bytes(), b"BAD header"),
            rec(&[0, 0, 0, 3, 0, 0], b"ok"),
            rec(&[0, 0, 0, 4, 0, 0], b"BAD and odd key"),
        ]);
        let mut reporter = Recording::default();

        let report = scanner().scan_store(&mut store, &mut reporter).unwrap();

        assert_eq!(report.visited(), 4);
        assert_eq!(report.damaged_count(), 3);
        assert!(report.get(0).unwrap().is_valid());
        assert_eq!(
            report.get(1).unwrap(),
            &Classification::Damaged {
                key: RecordKey::from_instance(2),
                instance: 2,
                message: "bad magic".to_string(),
            }
        );
        assert!(report.get(2).unwrap().is_malformed_key());
        // header failure wins over key width
        assert!(report.get(3).unwrap().is_damaged());
        assert_eq!(reporter.flagged, vec![1, 2, 3]);
        assert!(reporter.finished);
    }

    #[test]
    fn test_stale_estimate_does_not_overflow() {
        let records = (0..50u32).map(|n| rec(&n.to_be_bytes(), b"ok")).collect();
        let mut store = MockStore::new(records);
        store.estimate = 5;
        let mut reporter = Recording::default();

        let report = scanner().scan_store(&mut store, &mut reporter).unwrap();

        assert_eq!(report.visited(), 50);
        assert_eq!(report.total_estimate(), 5);
        assert_eq!(reporter.progress, vec![20, 40, 60, 80, 100]);
    }

    #[test]
    fn test_record_count_failure_is_setup_error() {
        let mut store = MockStore::new(vec![rec(&1u32.to_be_bytes(), b"BAD")]);
        store.fail_count = true;
        let mut reporter = Recording::default();

        let err = scanner().scan_store(&mut store, &mut reporter).unwrap_err();
        assert!(matches!(err, CheckError::RecordCount(_)));
        assert!(err.is_setup_failure());
        assert!(reporter.flagged.is_empty());
    }

    #[test]
    fn test_cursor_open_failure_is_setup_error() {
        let mut store = MockStore::new(vec![rec(&1u32.to_be_bytes(), b"ok")]);
        store.fail_cursor = true;

        let err = scanner()
            .scan_store(&mut store, &mut Recording::default())
            .unwrap_err();
        assert!(matches!(err, CheckError::CursorOpen(_)));
    }

    #[test]
    fn test_cursor_read_failure_aborts_without_report() {
        let mut store = MockStore::new(vec![
            rec(&1u32.to_be_bytes(), b"ok"),
            rec(&2u32.to_be_bytes(), b"ok"),
        ]);
        store.corrupt_at = Some(1);

        let err = scanner()
            .scan_store(&mut store, &mut Recording::default())
            .unwrap_err();
        assert!(matches!(err, CheckError::CursorRead { visited: 1, .. }));
    }

    #[test]
    fn test_cancel_flag_stops_between_records() {
        let mut store = MockStore::new(vec![rec(&1u32.to_be_bytes(), b"ok")]);
        let flag = Arc::new(AtomicBool::new(true));

        let err = scanner()
            .with_cancel_flag(flag)
            .scan_store(&mut store, &mut Recording::default())
            .unwrap_err();
        assert!(matches!(
            err,
            CheckError::Cancelled {
                phase: Phase::Scan,
                processed: 0
            }
        ));
    }

    #[test]
    fn test_empty_store() {
        let mut store = MockStore::new(Vec::new());
        let mut reporter = Recording::default();

        let report = scanner().scan_store(&mut store, &mut reporter).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.visited(), 0);
        assert!(reporter.progress.is_empty());
    }
}
