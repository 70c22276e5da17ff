//! Adapter implementations for check traits
//!
//! Binds the scanner and repair seams to the on-disk `PackageStore`.

use crate::storage::{PackageStore, StorageResult, StoreCursor};

use super::repair::StoreRepair;
use super::scanner::{RawRecord, RecordCursor, StoreScan};

// ============================================================================
// Scan side
// ============================================================================

impl RecordCursor for StoreCursor<'_> {
    fn next_record(&mut self) -> StorageResult<Option<RawRecord>> {
        StoreCursor::next_record(self)
    }
}

impl StoreScan for PackageStore {
    type Cursor<'a> = StoreCursor<'a>;

    fn approx_record_count(&mut self) -> StorageResult<u64> {
        PackageStore::approx_record_count(self)
    }

    fn open_cursor(&mut self) -> StorageResult<StoreCursor<'_>> {
        self.cursor()
    }
}

// ============================================================================
// Repair side
// ============================================================================

impl StoreRepair for PackageStore {
    fn fetch(&mut self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.get(key)
    }

    fn remove(&mut self, key: &[u8]) -> StorageResult<()> {
        self.delete(key)
    }
}
