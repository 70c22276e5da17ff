//! Observable events for pkgdbck
//!
//! Every `tracing` record emitted by the checker carries one of these as its
//! `event` field so log consumers can match on a stable name.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration file loaded and validated
    ConfigLoaded,

    // Store
    /// Store handle could not be opened (FATAL)
    StoreOpenFailed,

    // Scan
    ScanStart,
    /// Header failed validation
    RecordDamaged,
    /// Header is valid but the key is not four bytes wide
    RecordMalformedKey,
    ScanCancelled,
    ScanComplete,

    // Repair
    RepairStart,
    /// Record value durably written to the quarantine directory
    RecordQuarantined,
    RecordDeleted,
    /// Key vanished between scan and repair
    RecordAlreadyRemoved,
    RepairCancelled,
    RepairComplete,
    /// Repair stopped at a record it could not quarantine or delete (FATAL)
    RepairAborted,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::StoreOpenFailed => "STORE_OPEN_FAILED",

            Event::ScanStart => "SCAN_BEGIN",
            Event::RecordDamaged => "RECORD_DAMAGED",
            Event::RecordMalformedKey => "RECORD_MALFORMED_KEY",
            Event::ScanCancelled => "SCAN_CANCELLED",
            Event::ScanComplete => "SCAN_COMPLETE",

            Event::RepairStart => "REPAIR_BEGIN",
            Event::RecordQuarantined => "RECORD_QUARANTINED",
            Event::RecordDeleted => "RECORD_DELETED",
            Event::RecordAlreadyRemoved => "RECORD_ALREADY_REMOVED",
            Event::RepairCancelled => "REPAIR_CANCELLED",
            Event::RepairComplete => "REPAIR_COMPLETE",
            Event::RepairAborted => "REPAIR_ABORTED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::StoreOpenFailed | Event::RepairAborted)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::ConfigLoaded,
            Event::StoreOpenFailed,
            Event::ScanStart,
            Event::RecordDamaged,
            Event::RecordMalformedKey,
            Event::ScanCancelled,
            Event::ScanComplete,
            Event::RepairStart,
            Event::RecordQuarantined,
            Event::RecordDeleted,
            Event::RecordAlreadyRemoved,
            Event::RepairCancelled,
            Event::RepairComplete,
            Event::RepairAborted,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::StoreOpenFailed.is_fatal());
        assert!(Event::RepairAborted.is_fatal());
        assert!(!Event::RecordAlreadyRemoved.is_fatal());
    }

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(Event::ScanStart.to_string(), "SCAN_BEGIN");
    }
}
