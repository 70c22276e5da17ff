//! Classification report produced by a scan
//!
//! One `Classification` per visited record, stored in scan order. Position in
//! the report is the 0-based scan sequence index used to name quarantine
//! files.

use std::fmt;

/// Width of a well-formed key (big-endian `u32` instance number)
pub const KEY_WIDTH: usize = 4;

/// Exact key bytes of a store record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey(Vec<u8>);

impl RecordKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Key for a well-formed record with the given instance number
    pub fn from_instance(instance: u32) -> Self {
        Self(instance.to_be_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the key has the expected 4-byte width
    pub fn is_standard(&self) -> bool {
        self.0.len() == KEY_WIDTH
    }

    /// Big-endian decode of the leading key bytes.
    ///
    /// Keys shorter than four bytes are zero-filled on the right; longer keys
    /// contribute only their first four bytes.
    pub fn instance(&self) -> u32 {
        let mut buf = [0u8; KEY_WIDTH];
        let n = self.0.len().min(KEY_WIDTH);
        buf[..n].copy_from_slice(&self.0[..n]);
        u32::from_be_bytes(buf)
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.to_hex(), self.0.len())
    }
}

impl From<Vec<u8>> for RecordKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Verdict for one scanned record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Header validates and the key is well-formed. Never touched by repair.
    Valid,
    /// Header failed validation.
    Damaged {
        key: RecordKey,
        instance: u32,
        message: String,
    },
    /// Header validates but the key is not four bytes wide.
    MalformedKey {
        key: RecordKey,
        instance: u32,
        message: Option<String>,
    },
}

impl Classification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Classification::Valid)
    }

    pub fn is_damaged(&self) -> bool {
        matches!(self, Classification::Damaged { .. })
    }

    pub fn is_malformed_key(&self) -> bool {
        matches!(self, Classification::MalformedKey { .. })
    }
}

/// Which repair pass a target belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Damaged,
    MalformedKey,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Damaged => write!(f, "damaged"),
            TargetKind::MalformedKey => write!(f, "malformed-key"),
        }
    }
}

/// A non-valid record handed to the repair engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairTarget {
    /// 0-based scan sequence index
    pub index: u64,
    pub kind: TargetKind,
    pub key: RecordKey,
    pub instance: u32,
    pub message: Option<String>,
}

/// Ordered classification of every record visited by one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    total_estimate: u64,
    damaged_count: u64,
    entries: Vec<Classification>,
}

impl ScanReport {
    /// Empty report for a store that claimed `total_estimate` records
    pub fn new(total_estimate: u64) -> Self {
        Self {
            total_estimate,
            damaged_count: 0,
            entries: Vec::with_capacity(total_estimate.min(1 << 20) as usize),
        }
    }

    /// Appends the classification of the next visited record and returns its
    /// scan index.
    pub fn record(&mut self, classification: Classification) -> u64 {
        if !classification.is_valid() {
            self.damaged_count += 1;
        }
        self.entries.push(classification);
        (self.entries.len() - 1) as u64
    }

    /// Record count reported by the store when the scan started
    pub fn total_estimate(&self) -> u64 {
        self.total_estimate
    }

    /// Records actually visited
    pub fn visited(&self) -> u64 {
        self.entries.len() as u64
    }

    /// Records classified damaged or malformed-key
    pub fn damaged_count(&self) -> u64 {
        self.damaged_count
    }

    pub fn is_clean(&self) -> bool {
        self.damaged_count == 0
    }

    pub fn entries(&self) -> &[Classification] {
        &self.entries
    }

    pub fn get(&self, index: u64) -> Option<&Classification> {
        self.entries.get(usize::try_from(index).ok()?)
    }

    pub fn count_damaged(&self) -> u64 {
        self.entries.iter().filter(|c| c.is_damaged()).count() as u64
    }

    pub fn count_malformed_keys(&self) -> u64 {
        self.entries.iter().filter(|c| c.is_malformed_key()).count() as u64
    }

    /// Consumes the report and splits the non-valid records into the two
    /// repair passes.
    ///
    /// Damaged records come back in ascending scan order; malformed-key
    /// records most-recently-discovered first.
    pub fn into_repair_queues(self) -> (Vec<RepairTarget>, Vec<RepairTarget>) {
        let mut damaged = Vec::new();
        let mut malformed = Vec::new();

        for (index, classification) in self.entries.into_iter().enumerate() {
            let index = index as u64;
            match classification {
                Classification::Valid => {}
                Classification::Damaged {
                    key,
                    instance,
                    message,
                } => damaged.push(RepairTarget {
                    index,
                    kind: TargetKind::Damaged,
                    key,
                    instance,
                    message: Some(message),
                }),
                Classification::MalformedKey {
                    key,
                    instance,
                    message,
                } => malformed.push(RepairTarget {
                    index,
                    kind: TargetKind::MalformedKey,
                    key,
                    instance,
                    message,
                }),
            }
        }

        malformed.reverse();
        (damaged, malformed)
    }
}
