//! Package store
//!
//! The store holds one serialized package header per record, keyed by the
//! installation sequence number. On disk it is an append-only log of
//! checksummed put/delete records; opening a handle replays the log into an
//! ordered key index. Deletes are appended as tombstones.
//!
//! A checksum or framing failure anywhere in the log is fatal. The store
//! cannot be iterated past a corrupt record.

mod errors;
mod reader;
mod record;
mod store;
mod writer;

pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use reader::StoreReader;
pub use record::{RecordOp, StoreRecord};
pub use store::{AccessMode, PackageStore, StoreCursor, STORE_FILE};
pub use writer::StoreWriter;
