//! Construction of well-formed header blobs

use super::validator::TagType;

struct Entry {
    tag: u32,
    tag_type: TagType,
    count: u32,
    data: Vec<u8>,
}

/// Builds a serialized header from typed tag entries.
///
/// Entries are laid out in insertion order; the data store is padded so every
/// entry is aligned for its type.
#[derive(Default)]
pub struct HeaderBuilder {
    entries: Vec<Entry>,
}

impl HeaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, tag: u32, tag_type: TagType, count: usize, data: Vec<u8>) -> Self {
        self.entries.push(Entry {
            tag,
            tag_type,
            count: count as u32,
            data,
        });
        self
    }

    pub fn string(self, tag: u32, value: &str) -> Self {
        let mut data = value.as_bytes().to_vec();
        data.push(0);
        self.push(tag, TagType::String, 1, data)
    }

    pub fn string_array(self, tag: u32, values: &[&str]) -> Self {
        let mut data = Vec::new();
        for value in values {
            data.extend_from_slice(value.as_bytes());
            data.push(0);
        }
        self.push(tag, TagType::StringArray, values.len(), data)
    }

    pub fn int32(self, tag: u32, values: &[u32]) -> Self {
        let data = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.push(tag, TagType::Int32, values.len(), data)
    }

    /// Serializes the header.
    pub fn build(&self) -> Vec<u8> {
        let mut index = Vec::with_capacity(self.entries.len() * super::ENTRY_SIZE);
        let mut store: Vec<u8> = Vec::new();

        for entry in &self.entries {
            let align = entry.tag_type.alignment();
            while store.len() % align != 0 {
                store.push(0);
            }
            let offset = store.len() as u32;
            store.extend_from_slice(&entry.data);

            index.extend_from_slice(&entry.tag.to_be_bytes());
            index.extend_from_slice(&entry.tag_type.as_u32().to_be_bytes());
            index.extend_from_slice(&offset.to_be_bytes());
            index.extend_from_slice(&entry.count.to_be_bytes());
        }

        let mut blob = Vec::with_capacity(super::PREAMBLE_SIZE + index.len() + store.len());
        blob.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        blob.extend_from_slice(&(store.len() as u32).to_be_bytes());
        blob.extend_from_slice(&index);
        blob.extend_from_slice(&store);
        blob
    }
}
