//! Classification property tests
//!
//! Arbitrary record sets run through the scanner over an in-memory store.

use pkgdbck::check::{
    CheckConfig, Classification, ConsistencyScanner, RawRecord, RecordCursor, SilentReporter,
    StoreScan, KEY_WIDTH,
};
use pkgdbck::header::HeaderBuilder;
use pkgdbck::storage::StorageResult;
use proptest::prelude::*;

struct MemoryStore {
    records: Vec<RawRecord>,
}

struct MemoryCursor<'a> {
    records: std::slice::Iter<'a, RawRecord>,
}

impl RecordCursor for MemoryCursor<'_> {
    fn next_record(&mut self) -> StorageResult<Option<RawRecord>> {
        Ok(self.records.next().cloned())
    }
}

impl StoreScan for MemoryStore {
    type Cursor<'a> = MemoryCursor<'a>;

    fn approx_record_count(&mut self) -> StorageResult<u64> {
        Ok(self.records.len() as u64)
    }

    fn open_cursor(&mut self) -> StorageResult<MemoryCursor<'_>> {
        Ok(MemoryCursor {
            records: self.records.iter(),
        })
    }
}

fn record_strategy() -> impl Strategy<Value = RawRecord> {
    let key = prop::collection::vec(any::<u8>(), 1..8);
    let value = prop_oneof![
        "[a-z]{1,12}".prop_map(|name| HeaderBuilder::new().string(1000, &name).build()),
        prop::collection::vec(any::<u8>(), 0..64),
    ];
    (key, value)
}

proptest! {
    #[test]
    fn prop_damaged_count_matches_entries(records in prop::collection::vec(record_strategy(), 0..40)) {
        let mut store = MemoryStore { records: records.clone() };
        let report = ConsistencyScanner::new(&CheckConfig::default())
            .scan_store(&mut store, &mut SilentReporter)
            .unwrap();

        prop_assert_eq!(report.visited(), records.len() as u64);
        prop_assert_eq!(
            report.damaged_count(),
            report.count_damaged() + report.count_malformed_keys()
        );
        prop_assert_eq!(
            report.damaged_count(),
            report.entries().iter().filter(|c| !c.is_valid()).count() as u64
        );
    }

    #[test]
    fn prop_flagged_keys_keep_exact_bytes(records in prop::collection::vec(record_strategy(), 1..40)) {
        let mut store = MemoryStore { records: records.clone() };
        let report = ConsistencyScanner::new(&CheckConfig::default())
            .scan_store(&mut store, &mut SilentReporter)
            .unwrap();

        for (entry, (key, _)) in report.entries().iter().zip(&records) {
            match entry {
                Classification::Valid => prop_assert_eq!(key.len(), KEY_WIDTH),
                Classification::Damaged { key: seen, .. } => {
                    prop_assert_eq!(seen.as_bytes(), key.as_slice())
                }
                Classification::MalformedKey { key: seen, .. } => {
                    prop_assert_eq!(seen.as_bytes(), key.as_slice());
                    prop_assert_ne!(key.len(), KEY_WIDTH);
                }
            }
        }

        let (damaged, malformed) = report.into_repair_queues();
        prop_assert!(damaged.windows(2).all(|w| w[0].index < w[1].index));
        prop_assert!(malformed.windows(2).all(|w| w[0].index > w[1].index));
    }
}
