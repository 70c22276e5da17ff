//! Sequential and positional reader for the store log
//!
//! Every read validates the record checksum. A checksum or framing failure is
//! reported as `PKGDB_DATA_CORRUPTION` with the byte offset of the record.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use super::errors::{StorageError, StorageResult};
use super::record::{StoreRecord, MIN_RECORD_SIZE};

/// Reader over the append-only record log.
pub struct StoreReader {
    reader: BufReader<File>,
    current_offset: u64,
    file_size: u64,
}

impl StoreReader {
    /// Opens the log file for reading.
    pub fn open(log_path: &Path) -> StorageResult<Self> {
        let file = File::open(log_path)
            .map_err(|e| StorageError::read_failed(format!("cannot open {}", log_path.display()), e))?;
        let file_size = log_len(&file)?;

        Ok(Self {
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
        })
    }

    /// Offset of the next record `read_next` will return.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Reads the record at the current offset and moves past it.
    ///
    /// `Ok(None)` means the log ended exactly on a record boundary. Anything
    /// short of a whole, checksum-clean record is `PKGDB_DATA_CORRUPTION`.
    pub fn read_next(&mut self) -> StorageResult<Option<StoreRecord>> {
        let at = self.current_offset;
        if at >= self.file_size {
            return Ok(None);
        }
        let corrupt = |detail: String| StorageError::corruption_at_offset(at, detail);

        let left = self.file_size - at;
        if left < MIN_RECORD_SIZE as u64 {
            return Err(corrupt(format!("{} trailing bytes after last record", left)));
        }

        let mut frame = [0u8; 4];
        self.reader
            .read_exact(&mut frame)
            .map_err(|e| corrupt(format!("length prefix unreadable: {}", e)))?;
        let len = u32::from_le_bytes(frame) as u64;
        if !(MIN_RECORD_SIZE as u64..=left).contains(&len) {
            return Err(corrupt(format!(
                "length prefix {} outside {}..={}",
                len, MIN_RECORD_SIZE, left
            )));
        }

        let mut buf = vec![0u8; len as usize];
        buf[..4].copy_from_slice(&frame);
        self.reader
            .read_exact(&mut buf[4..])
            .map_err(|e| corrupt(format!("record body unreadable: {}", e)))?;

        let (record, consumed) =
            StoreRecord::deserialize(&buf).map_err(|e| corrupt(e.to_string()))?;
        self.current_offset += consumed as u64;
        Ok(Some(record))
    }

    /// Moves to `offset`. The log length is re-read so records appended
    /// since open become visible.
    pub fn seek_to(&mut self, offset: u64) -> StorageResult<()> {
        self.file_size = log_len(self.reader.get_ref())?;
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| StorageError::read_failed(format!("cannot seek to {}", offset), e))?;
        self.current_offset = offset;
        Ok(())
    }

    /// Reads the record starting at `offset`.
    pub fn read_at(&mut self, offset: u64) -> StorageResult<StoreRecord> {
        self.seek_to(offset)?;
        self.read_next()?.ok_or_else(|| {
            StorageError::corruption_at_offset(offset, "index points past end of log")
        })
    }

    pub fn reset(&mut self) -> StorageResult<()> {
        self.seek_to(0)
    }
}

fn log_len(file: &File) -> StorageResult<u64> {
    file.metadata()
        .map(|m| m.len())
        .map_err(|e| StorageError::read_failed("cannot stat store log", e))
}
