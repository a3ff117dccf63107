//! Run-scoped source to target hash cache

use std::collections::HashMap;

use rehash_core::{ObjectId, TargetHash};

/// Outcome of recording a hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheInsert {
    /// First time this source hash was seen
    Recorded,
    /// Same mapping was already present
    Unchanged,
    /// A different target was already recorded; the existing one is kept
    Conflict { existing: TargetHash },
}

/// Append-only mapping from source id to target hash.
///
/// Once a source id is assigned a target it keeps it for the lifetime of
/// the cache; later records never overwrite it.
#[derive(Debug, Default)]
pub struct HashCache {
    entries: HashMap<ObjectId, TargetHash>,
}

impl HashCache {
    /// Create new empty cache
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Target hash for a source id, if resolved
    pub fn get(&self, id: &ObjectId) -> Option<&TargetHash> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.entries.contains_key(id)
    }

    /// Record a mapping without ever replacing an existing one
    pub fn record(&mut self, id: ObjectId, target: TargetHash) -> CacheInsert {
        match self.entries.get(&id) {
            Some(existing) if *existing == target => CacheInsert::Unchanged,
            Some(existing) => CacheInsert::Conflict {
                existing: existing.clone(),
            },
            None => {
                self.entries.insert(id, target);
                CacheInsert::Recorded
            }
        }
    }

    /// Number of resolved hashes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
