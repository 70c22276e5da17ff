//! Append side of the store log
//!
//! A record counts as written only after `sync_all` returns.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use super::errors::{StorageError, StorageResult};
use super::record::StoreRecord;

/// Durable appender for the record log.
pub struct StoreWriter {
    file: File,
    end: u64,
}

impl StoreWriter {
    /// Opens the log for appending. The log and its directory are created on
    /// first use.
    pub fn open(log_path: &Path) -> StorageResult<Self> {
        if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                StorageError::write_failed(format!("cannot create {}", parent.display()), e)
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(log_path)
            .map_err(|e| {
                StorageError::write_failed(format!("cannot open {} for append", log_path.display()), e)
            })?;

        let end = file
            .metadata()
            .map_err(|e| StorageError::write_failed("cannot stat store log", e))?
            .len();

        Ok(Self { file, end })
    }

    /// Writes `record` at the end of the log and syncs it.
    ///
    /// Returns the offset the record starts at.
    pub fn append(&mut self, record: &StoreRecord) -> StorageResult<u64> {
        let bytes = record.serialize();
        let at = self.end;

        self.file
            .write_all(&bytes)
            .and_then(|()| self.file.sync_all())
            .map_err(|e| {
                StorageError::write_failed(format!("{:?} record at offset {} not durable", record.op, at), e)
            })?;

        self.end += bytes.len() as u64;
        Ok(at)
    }
}
