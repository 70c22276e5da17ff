//! pkgdbck - consistency checker and repairer for a package-metadata store
//!
//! The store maps 4-byte big-endian instance numbers to serialized package
//! headers. A check walks every record, validates its header and key width,
//! and optionally quarantines and deletes whatever fails.

pub mod check;
pub mod cli;
pub mod header;
pub mod observability;
pub mod storage;
