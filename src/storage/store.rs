//! Package store handle
//!
//! Opening a store replays the record log into an ordered key index (latest
//! record per key wins, deletes remove the key). Reads go back to disk and
//! re-verify checksums; writes append to the log and fsync.

use std::collections::BTreeMap;
use std::path::Path;

use super::errors::{StorageError, StorageResult};
use super::reader::StoreReader;
use super::record::{RecordOp, StoreRecord};
use super::writer::StoreWriter;

/// File name of the record log inside the store directory
pub const STORE_FILE: &str = "Packages";

/// Access mode a store handle was opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// An open handle on a package store directory.
///
/// The handle owns its file descriptors; dropping it closes the store.
pub struct PackageStore {
    mode: AccessMode,
    index: BTreeMap<Vec<u8>, u64>,
    reader: StoreReader,
    writer: Option<StoreWriter>,
}

impl PackageStore {
    /// Opens an existing store without write access.
    pub fn open_read_only(dir: &Path) -> StorageResult<Self> {
        let log_path = dir.join(STORE_FILE);
        let mut reader = StoreReader::open(&log_path)?;
        let index = build_index(&mut reader)?;

        Ok(Self {
            mode: AccessMode::ReadOnly,
            index,
            reader,
            writer: None,
        })
    }

    /// Opens a store for reading and writing, creating it if missing.
    pub fn open_read_write(dir: &Path) -> StorageResult<Self> {
        let log_path = dir.join(STORE_FILE);
        let writer = StoreWriter::open(&log_path)?;
        let mut reader = StoreReader::open(&log_path)?;
        let index = build_index(&mut reader)?;

        Ok(Self {
            mode: AccessMode::ReadWrite,
            index,
            reader,
            writer: Some(writer),
        })
    }

    /// Returns the mode this handle was opened with.
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Number of live keys as of the last index update.
    ///
    /// Callers must treat this as an estimate: another process may change the
    /// store after this handle was opened.
    pub fn approx_record_count(&self) -> StorageResult<u64> {
        Ok(self.index.len() as u64)
    }

    /// Opens a forward cursor over the store in key order.
    pub fn cursor(&mut self) -> StorageResult<StoreCursor<'_>> {
        let entries: Vec<(Vec<u8>, u64)> = self
            .index
            .iter()
            .map(|(key, offset)| (key.clone(), *offset))
            .collect();

        Ok(StoreCursor {
            reader: &mut self.reader,
            entries: entries.into_iter(),
        })
    }

    /// Fetches the value stored under `key`, `Ok(None)` if absent.
    pub fn get(&mut self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let offset = match self.index.get(key) {
            Some(offset) => *offset,
            None => return Ok(None),
        };
        read_value(&mut self.reader, key, offset).map(Some)
    }

    /// Returns whether `key` is present.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.index.contains_key(key)
    }

    /// Stores `value` under `key`.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| StorageError::read_only("put"))?;
        let offset = writer.append(&StoreRecord::put(key, value))?;
        self.index.insert(key.to_vec(), offset);
        Ok(())
    }

    /// Removes `key`. Fails with `PKGDB_KEY_NOT_FOUND` if it is absent.
    pub fn delete(&mut self, key: &[u8]) -> StorageResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| StorageError::read_only("delete"))?;
        if !self.index.contains_key(key) {
            return Err(StorageError::not_found(key));
        }
        writer.append(&StoreRecord::delete(key))?;
        self.index.remove(key);
        Ok(())
    }
}

/// Forward cursor over a snapshot of the key index.
pub struct StoreCursor<'a> {
    reader: &'a mut StoreReader,
    entries: std::vec::IntoIter<(Vec<u8>, u64)>,
}

impl StoreCursor<'_> {
    /// Returns the next `(key, value)` pair, `Ok(None)` when exhausted.
    pub fn next_record(&mut self) -> StorageResult<Option<(Vec<u8>, Vec<u8>)>> {
        match self.entries.next() {
            Some((key, offset)) => {
                let value = read_value(&mut *self.reader, &key, offset)?;
                Ok(Some((key, value)))
            }
            None => Ok(None),
        }
    }
}

fn build_index(reader: &mut StoreReader) -> StorageResult<BTreeMap<Vec<u8>, u64>> {
    let mut index = BTreeMap::new();
    reader.reset()?;

    loop {
        let offset = reader.current_offset();
        match reader.read_next()? {
            Some(record) => match record.op {
                RecordOp::Put => {
                    index.insert(record.key, offset);
                }
                RecordOp::Delete => {
                    index.remove(&record.key);
                }
            },
            None => break,
        }
    }

    Ok(index)
}

fn read_value(reader: &mut StoreReader, key: &[u8], offset: u64) -> StorageResult<Vec<u8>> {
    let record = reader.read_at(offset)?;
    if record.op != RecordOp::Put || record.key != key {
        return Err(StorageError::corruption_at_offset(
            offset,
            "Index points at a record for a different key",
        ));
    }
    Ok(record.value)
}
