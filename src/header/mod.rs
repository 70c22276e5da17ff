//! Package header structural checks
//!
//! A serialized header is an index of typed tag entries followed by a data
//! store the entries point into:
//!
//! ```text
//! +------------------+
//! | il               | (u32 BE, number of index entries)
//! +------------------+
//! | dl               | (u32 BE, data store length)
//! +------------------+
//! | entry[0..il]     | (tag, type, offset, count: 4 x u32 BE)
//! +------------------+
//! | data[0..dl]      |
//! +------------------+
//! ```
//!
//! The checker only verifies that the blob is self-consistent. It does not
//! interpret tag semantics.

mod builder;
mod validator;

pub use builder::HeaderBuilder;
pub use validator::{HeaderCheck, HeaderStatus, HeaderVerdict, StructuralValidator, TagType};

/// Size of the `il`/`dl` preamble
pub const PREAMBLE_SIZE: usize = 8;

/// Size of one index entry
pub const ENTRY_SIZE: usize = 16;

/// Largest accepted index entry count
pub const MAX_INDEX_ENTRIES: u32 = 0xFFFF;

/// Largest accepted data store (256 MiB)
pub const MAX_DATA_LENGTH: u32 = 256 * 1024 * 1024;
