//! Tree records: `<mode> <name>\0<20-byte hash>` repeated to the end.
//!
//! The dual form inserts the target hash right after each source hash.

use rehash_core::error::{RehashError, RehashResult};
use rehash_core::{ObjectId, ObjectKind, TargetHash};

use super::{Links, PatchLocation};

/// One record located within a tree buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeRecord {
    /// Start of the `<mode> <name>` part
    pub start: usize,
    /// Offset of the first hash byte
    pub hash_start: usize,
}

impl TreeRecord {
    /// Offset just past the source hash
    pub fn hash_end(&self) -> usize {
        self.hash_start + ObjectId::LEN
    }
}

/// Walks tree records, skipping `suffix` bytes after each source hash.
///
/// `suffix` is zero for source-form trees and the target width for the
/// dual form.
pub struct TreeRecords<'a> {
    content: &'a [u8],
    pos: usize,
    suffix: usize,
}

impl<'a> TreeRecords<'a> {
    pub fn new(content: &'a [u8], suffix: usize) -> Self {
        Self { content, pos: 0, suffix }
    }
}

impl<'a> Iterator for TreeRecords<'a> {
    type Item = RehashResult<TreeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.content.len() {
            return None;
        }
        let start = self.pos;
        let Some(nul) = self.content[start..].iter().position(|&b| b == 0) else {
            self.pos = self.content.len();
            return Some(Err(RehashError::malformed(
                ObjectKind::Tree,
                format!("entry at offset {} has no NUL delimiter", start),
            )));
        };
        let hash_start = start + nul + 1;
        let record_end = hash_start + ObjectId::LEN + self.suffix;
        if record_end > self.content.len() {
            self.pos = self.content.len();
            return Some(Err(RehashError::malformed(
                ObjectKind::Tree,
                format!("entry at offset {} is truncated", start),
            )));
        }
        self.pos = record_end;
        Some(Ok(TreeRecord { start, hash_start }))
    }
}

/// Collect the source hashes referenced by a source-form tree
pub fn parse_links(content: &[u8]) -> RehashResult<Links> {
    let mut links = Links::new();
    for record in TreeRecords::new(content, 0) {
        let record = record?;
        let id = ObjectId::from_slice(&content[record.hash_start..record.hash_end()])?;
        links
            .entry(id)
            .or_default()
            .push(PatchLocation::Offset(record.hash_end()));
    }
    Ok(links)
}

/// Insert target hashes at their offsets; `patches` must be sorted
pub fn patch(content: &[u8], patches: &[(PatchLocation, &TargetHash)]) -> Vec<u8> {
    let extra: usize = patches.iter().map(|(_, target)| target.len()).sum();
    let mut out = Vec::with_capacity(content.len() + extra);
    let mut copied = 0;
    for (location, target) in patches {
        if let PatchLocation::Offset(offset) = *location {
            out.extend_from_slice(&content[copied..offset]);
            out.extend_from_slice(target.as_bytes());
            copied = offset;
        }
    }
    out.extend_from_slice(&content[copied..]);
    out
}

/// Drop the `target_width` bytes following every source hash
pub fn restore(content: &[u8], target_width: usize) -> RehashResult<Vec<u8>> {
    let mut out = Vec::with_capacity(content.len());
    for record in TreeRecords::new(content, target_width) {
        let record = record?;
        out.extend_from_slice(&content[record.start..record.hash_end()]);
    }
    Ok(out)
}
