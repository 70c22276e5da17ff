//! Structural header validator

use super::{ENTRY_SIZE, MAX_DATA_LENGTH, MAX_INDEX_ENTRIES, PREAMBLE_SIZE};

/// Data type of a header tag entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagType {
    Char,
    Int8,
    Int16,
    Int32,
    Int64,
    String,
    Bin,
    StringArray,
    I18nString,
}

impl TagType {
    /// Decodes the on-disk type number. `0` (null) and anything above `9` are
    /// not valid entry types.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(TagType::Char),
            2 => Some(TagType::Int8),
            3 => Some(TagType::Int16),
            4 => Some(TagType::Int32),
            5 => Some(TagType::Int64),
            6 => Some(TagType::String),
            7 => Some(TagType::Bin),
            8 => Some(TagType::StringArray),
            9 => Some(TagType::I18nString),
            _ => None,
        }
    }

    /// On-disk type number
    pub fn as_u32(self) -> u32 {
        match self {
            TagType::Char => 1,
            TagType::Int8 => 2,
            TagType::Int16 => 3,
            TagType::Int32 => 4,
            TagType::Int64 => 5,
            TagType::String => 6,
            TagType::Bin => 7,
            TagType::StringArray => 8,
            TagType::I18nString => 9,
        }
    }

    /// Width of one element for fixed-size types
    pub fn element_size(self) -> Option<usize> {
        match self {
            TagType::Char | TagType::Int8 | TagType::Bin => Some(1),
            TagType::Int16 => Some(2),
            TagType::Int32 => Some(4),
            TagType::Int64 => Some(8),
            TagType::String | TagType::StringArray | TagType::I18nString => None,
        }
    }

    /// Required data store alignment
    pub fn alignment(self) -> usize {
        self.element_size().unwrap_or(1)
    }
}

/// Outcome class of a header check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStatus {
    Valid,
    Invalid,
}

/// Result of checking one header blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderVerdict {
    pub status: HeaderStatus,
    pub message: Option<String>,
}

impl HeaderVerdict {
    pub fn valid() -> Self {
        Self {
            status: HeaderStatus::Valid,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            status: HeaderStatus::Invalid,
            message: Some(message.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == HeaderStatus::Valid
    }
}

/// Validates a serialized header blob.
pub trait HeaderCheck {
    fn check(&self, blob: &[u8]) -> HeaderVerdict;
}

impl<F> HeaderCheck for F
where
    F: Fn(&[u8]) -> HeaderVerdict,
{
    fn check(&self, blob: &[u8]) -> HeaderVerdict {
        self(blob)
    }
}

/// Checks index/data-store consistency of a header blob.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl HeaderCheck for StructuralValidator {
    fn check(&self, blob: &[u8]) -> HeaderVerdict {
        match verify_layout(blob) {
            Ok(()) => HeaderVerdict::valid(),
            Err(message) => HeaderVerdict::invalid(message),
        }
    }
}

fn be_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn verify_layout(blob: &[u8]) -> Result<(), String> {
    if blob.len() < PREAMBLE_SIZE {
        return Err(format!(
            "hdr size({}): BAD, too short for index preamble",
            blob.len()
        ));
    }

    let il = be_u32(blob, 0);
    let dl = be_u32(blob, 4);

    if il == 0 || il > MAX_INDEX_ENTRIES {
        return Err(format!("hdr tags: BAD, no. of tags({}) out of range", il));
    }
    if dl > MAX_DATA_LENGTH {
        return Err(format!("hdr data: BAD, no. of bytes({}) out of range", dl));
    }

    let index_len = il as usize * ENTRY_SIZE;
    let expected = PREAMBLE_SIZE + index_len + dl as usize;
    if blob.len() != expected {
        return Err(format!(
            "hdr blob({}): BAD, expected {} bytes for {} tags and {} data bytes",
            blob.len(),
            expected,
            il,
            dl
        ));
    }

    let data = &blob[PREAMBLE_SIZE + index_len..];

    for i in 0..il as usize {
        let at = PREAMBLE_SIZE + i * ENTRY_SIZE;
        let tag = be_u32(blob, at);
        let raw_type = be_u32(blob, at + 4);
        let offset = be_u32(blob, at + 8) as usize;
        let count = be_u32(blob, at + 12) as usize;

        let entry_err = |what: String| format!("tag[{}] {}: BAD, {}", i, tag, what);

        let tag_type =
            TagType::from_u32(raw_type).ok_or_else(|| entry_err(format!("type {}", raw_type)))?;

        if count == 0 {
            return Err(entry_err("count 0".to_string()));
        }
        if offset >= data.len() {
            return Err(entry_err(format!(
                "offset {} beyond data store of {} bytes",
                offset,
                data.len()
            )));
        }
        if offset % tag_type.alignment() != 0 {
            return Err(entry_err(format!(
                "offset {} not aligned for {:?}",
                offset, tag_type
            )));
        }

        match tag_type.element_size() {
            Some(size) => {
                let end = count
                    .checked_mul(size)
                    .and_then(|len| len.checked_add(offset))
                    .ok_or_else(|| entry_err(format!("count {} overflows", count)))?;
                if end > data.len() {
                    return Err(entry_err(format!(
                        "{} bytes at offset {} overrun data store",
                        end - offset,
                        offset
                    )));
                }
            }
            None => {
                if tag_type == TagType::String && count != 1 {
                    return Err(entry_err(format!("string with count {}", count)));
                }
                let mut cursor = offset;
                for n in 0..count {
                    if cursor >= data.len() {
                        return Err(entry_err(format!(
                            "string {} of {} starts past data store",
                            n + 1,
                            count
                        )));
                    }
                    let nul = data[cursor..]
                        .iter()
                        .position(|b| *b == 0)
                        .ok_or_else(|| entry_err("unterminated string".to_string()))?;
                    cursor += nul + 1;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::HeaderBuilder;
    use super::*;

    fn sample_header() -> Vec<u8> {
        HeaderBuilder::new()
            .string(1000, "bash")
            .string(1001, "5.2.15")
            .int32(1009, &[8_192_000])
            .string_array(1047, &["libc.so.6", "libtinfo.so.6"])
            .build()
    }

    #[test]
    fn test_well_formed_header_is_valid() {
        let verdict = StructuralValidator.check(&sample_header());
        assert_eq!(verdict, HeaderVerdict::valid());
    }

    #[test]
    fn test_short_blob_is_invalid() {
        let verdict = StructuralValidator.check(&[0, 0, 0]);
        assert_eq!(verdict.status, HeaderStatus::Invalid);
        assert!(verdict.message.unwrap().contains("too short"));
    }

    #[test]
    fn test_zero_tags_is_invalid() {
        let verdict = StructuralValidator.check(&[0; 8]);
        assert!(!verdict.is_valid());
        assert!(verdict.message.unwrap().contains("no. of tags(0)"));
    }

    #[test]
    fn test_truncated_blob_is_invalid() {
        let blob = sample_header();
        let verdict = StructuralValidator.check(&blob[..blob.len() - 3]);
        assert!(!verdict.is_valid());
    }

    #[test]
    fn test_bad_type_is_invalid() {
        let mut blob = sample_header();
        // type field of the first entry
        blob[PREAMBLE_SIZE + 4..PREAMBLE_SIZE + 8].copy_from_slice(&42u32.to_be_bytes());
        let verdict = StructuralValidator.check(&blob);
        assert!(verdict.message.unwrap().contains("type 42"));
    }

    #[test]
    fn test_offset_out_of_range_is_invalid() {
        let mut blob = sample_header();
        blob[PREAMBLE_SIZE + 8..PREAMBLE_SIZE + 12].copy_from_slice(&9999u32.to_be_bytes());
        let verdict = StructuralValidator.check(&blob);
        assert!(verdict.message.unwrap().contains("offset 9999"));
    }

    #[test]
    fn test_unterminated_string_is_invalid() {
        let mut blob = HeaderBuilder::new().string(1000, "zsh").build();
        let last = blob.len() - 1;
        blob[last] = b'!';
        let verdict = StructuralValidator.check(&blob);
        assert!(verdict.message.unwrap().contains("unterminated"));
    }

    #[test]
    fn test_closure_validator() {
        let reject_all = |_: &[u8]| HeaderVerdict::invalid("nope");
        assert!(!reject_all.check(&sample_header()).is_valid());
    }
}
