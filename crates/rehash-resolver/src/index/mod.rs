//! Pending entries and the index of who waits on which hash
//!
//! A pending entry is a buffered non-blob object whose references are not
//! all resolved yet. The dependency index maps each missing source hash to
//! the entries waiting on it; when the hash arrives its waiters are taken
//! out and re-attempted.

use indexmap::IndexMap;
use rehash_codec::Links;
use rehash_core::{ObjectId, ObjectKind};

use crate::cache::HashCache;

/// Identifies a pending entry within one run
pub type EntryId = usize;

/// A buffered object waiting for its references to resolve
#[derive(Debug)]
pub struct PendingEntry {
    /// Object kind
    pub kind: ObjectKind,
    /// Source-format length, carried through to the output unchanged
    pub declared_length: u64,
    /// Source id of this object
    pub source_id: ObjectId,
    /// Referenced source ids and their patch locations
    pub links: Links,
    /// Set once resolution starts; guards against a second emission
    pub resolving: bool,
    /// Number of failed resolution attempts
    pub attempts: u32,
    /// Source-format content, owned until emitted
    pub buffer: Vec<u8>,
}

impl PendingEntry {
    pub fn new(kind: ObjectKind, declared_length: u64, source_id: ObjectId, links: Links, buffer: Vec<u8>) -> Self {
        Self {
            kind,
            declared_length,
            source_id,
            links,
            resolving: false,
            attempts: 0,
            buffer,
        }
    }

    /// Whether every referenced hash has a target
    pub fn is_ready(&self, cache: &HashCache) -> bool {
        self.links.keys().all(|id| cache.contains(id))
    }

    /// Referenced hashes still missing from the cache
    pub fn missing<'a>(&'a self, cache: &'a HashCache) -> impl Iterator<Item = &'a ObjectId> + 'a {
        self.links.keys().filter(move |id| !cache.contains(id))
    }
}

/// Missing source hash to the entries waiting on it.
///
/// Iteration follows first registration order, which makes root selection
/// at the end of input deterministic.
#[derive(Debug, Default)]
pub struct DependencyIndex {
    waiters: IndexMap<ObjectId, Vec<EntryId>>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self {
            waiters: IndexMap::new(),
        }
    }

    /// Register `entry` as waiting on `hash`
    pub fn register(&mut self, hash: ObjectId, entry: EntryId) {
        let waiters = self.waiters.entry(hash).or_default();
        if !waiters.contains(&entry) {
            waiters.push(entry);
        }
    }

    /// Remove and return everyone waiting on `hash`
    pub fn take(&mut self, hash: &ObjectId) -> Vec<EntryId> {
        self.waiters.shift_remove(hash).unwrap_or_default()
    }

    /// Entries waiting on `hash`
    pub fn waiting_on(&self, hash: &ObjectId) -> &[EntryId] {
        self.waiters.get(hash).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every waiting entry once, in registration order
    pub fn waiting_entries(&self) -> Vec<EntryId> {
        let mut seen = std::collections::HashSet::new();
        self.waiters
            .values()
            .flatten()
            .copied()
            .filter(|entry| seen.insert(*entry))
            .collect()
    }

    /// Hashes someone is waiting on, in registration order
    pub fn hashes(&self) -> impl Iterator<Item = &ObjectId> {
        self.waiters.keys()
    }

    pub fn contains(&self, hash: &ObjectId) -> bool {
        self.waiters.contains_key(hash)
    }

    /// Number of distinct missing hashes
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}
