//! Record framing for the package store log
//!
//! Every put or delete is appended as one self-checking record:
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE, includes itself and the checksum)
//! +------------------+
//! | Op               | (u8: 1 = put, 2 = delete)
//! +------------------+
//! | Key              | (length-prefixed bytes)
//! +------------------+
//! | Value            | (length-prefixed bytes, empty for deletes)
//! +------------------+
//! | Checksum         | (CRC32 u32 LE)
//! +------------------+
//! ```
//!
//! The checksum covers all bytes except the checksum itself.

use std::io;

/// Smallest possible record: length + op + two empty byte strings + checksum
pub(crate) const MIN_RECORD_SIZE: usize = 4 + 1 + 4 + 4 + 4;

const OP_PUT: u8 = 1;
const OP_DELETE: u8 = 2;

/// Operation recorded in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOp {
    /// Key now maps to the record's value
    Put,
    /// Key is removed
    Delete,
}

impl From<RecordOp> for u8 {
    fn from(op: RecordOp) -> u8 {
        match op {
            RecordOp::Put => OP_PUT,
            RecordOp::Delete => OP_DELETE,
        }
    }
}

impl TryFrom<u8> for RecordOp {
    type Error = io::Error;

    fn try_from(byte: u8) -> io::Result<Self> {
        match byte {
            OP_PUT => Ok(RecordOp::Put),
            OP_DELETE => Ok(RecordOp::Delete),
            other => Err(invalid(format!("op byte {} is neither put nor delete", other))),
        }
    }
}

/// One entry of the append-only store log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRecord {
    pub op: RecordOp,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl StoreRecord {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            op: RecordOp::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        Self {
            op: RecordOp::Delete,
            key: key.into(),
            value: Vec::new(),
        }
    }

    /// Encodes the record, checksum included.
    pub fn serialize(&self) -> Vec<u8> {
        let total = MIN_RECORD_SIZE + self.key.len() + self.value.len();

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.push(self.op.into());
        for field in [&self.key, &self.value] {
            out.extend_from_slice(&(field.len() as u32).to_le_bytes());
            out.extend_from_slice(field);
        }
        let crc = crc32fast::hash(&out);
        out.extend_from_slice(&crc.to_le_bytes());
        out
    }

    /// Decodes one record from the front of `data`.
    ///
    /// Returns the record and its encoded length. The checksum is verified
    /// before any field is interpreted.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        let (len_bytes, _) = split(data, 4)?;
        let len = le_u32(len_bytes) as usize;
        if len < MIN_RECORD_SIZE {
            return Err(invalid(format!("length field {} below minimum", len)));
        }
        if data.len() < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("record needs {} bytes, {} available", len, data.len()),
            ));
        }

        let (covered, crc_bytes) = data[..len].split_at(len - 4);
        let stored = le_u32(crc_bytes);
        let actual = crc32fast::hash(covered);
        if stored != actual {
            return Err(invalid(format!(
                "crc32 {:08x} does not match stored {:08x}",
                actual, stored
            )));
        }

        let op = RecordOp::try_from(covered[4])?;
        let (key, rest) = take_field(&covered[5..])?;
        let (value, rest) = take_field(rest)?;
        if !rest.is_empty() {
            return Err(invalid(format!("{} stray bytes before checksum", rest.len())));
        }

        Ok((
            Self {
                op,
                key: key.to_vec(),
                value: value.to_vec(),
            },
            len,
        ))
    }
}

fn invalid(detail: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, detail)
}

fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn split(data: &[u8], at: usize) -> io::Result<(&[u8], &[u8])> {
    if data.len() < at {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("wanted {} bytes, {} available", at, data.len()),
        ));
    }
    Ok(data.split_at(at))
}

/// Splits a u32-length-prefixed byte string off the front of `data`.
fn take_field(data: &[u8]) -> io::Result<(&[u8], &[u8])> {
    let (len, rest) = split(data, 4)?;
    split(rest, le_u32(len) as usize).map_err(|_| invalid("field overruns record".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_record_roundtrip() {
        let record = StoreRecord::put(7u32.to_be_bytes(), b"header bytes".to_vec());
        let serialized = record.serialize();
        let (parsed, consumed) = StoreRecord::deserialize(&serialized).unwrap();

        assert_eq!(parsed, record);
        assert_eq!(consumed, serialized.len());
    }

    #[test]
    fn test_delete_record_has_empty_value() {
        let record = StoreRecord::delete(vec![1, 2, 3, 4, 5, 6]);
        let (parsed, _) = StoreRecord::deserialize(&record.serialize()).unwrap();

        assert_eq!(parsed.op, RecordOp::Delete);
        assert_eq!(parsed.key, vec![1, 2, 3, 4, 5, 6]);
        assert!(parsed.value.is_empty());
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut serialized = StoreRecord::put(vec![0, 0, 0, 1], vec![0xAB; 32]).serialize();
        let mid = serialized.len() / 2;
        serialized[mid] ^= 0xFF;

        let err = StoreRecord::deserialize(&serialized).unwrap_err();
        assert!(err.to_string().contains("does not match stored"));
    }

    #[test]
    fn test_unknown_op_rejected() {
        let mut serialized = StoreRecord::put(vec![0, 0, 0, 1], vec![1]).serialize();
        serialized[4] = 9;
        let end = serialized.len() - 4;
        let checksum = crc32fast::hash(&serialized[..end]);
        serialized[end..].copy_from_slice(&checksum.to_le_bytes());

        let err = StoreRecord::deserialize(&serialized).unwrap_err();
        assert!(err.to_string().contains("op byte 9"));
    }

    #[test]
    fn test_truncated_record_rejected() {
        let serialized = StoreRecord::put(vec![0, 0, 0, 1], vec![0; 64]).serialize();
        let err = StoreRecord::deserialize(&serialized[..serialized.len() - 10]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
