//! External hash lookup collaborators
//!
//! When the input ends with references still unresolved, the engine asks a
//! lookup for the target hash of each missing source hash. The engine
//! calls a lookup at most once per hash per run and has no timeout of its
//! own; a lookup that never completes stalls the run.

use std::collections::HashMap;
use std::future::Future;

use rehash_core::error::{RehashError, RehashResult};
use rehash_core::utils::hex::decode_hex;
use rehash_core::{ObjectId, TargetHash};

/// Resolves a source hash (lowercase hex) to raw target hash bytes
pub trait Lookup: Send {
    fn lookup(&mut self, source_hex: &str) -> impl Future<Output = RehashResult<Vec<u8>>> + Send;
}

/// Lookup that always fails; for runs whose input is self-contained
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLookup;

impl Lookup for NoLookup {
    async fn lookup(&mut self, source_hex: &str) -> RehashResult<Vec<u8>> {
        Err(RehashError::LookupFailure {
            hash: source_hex.to_string(),
            message: "no lookup collaborator configured".to_string(),
            source: None,
        })
    }
}

/// Lookup answering from an in-memory map
#[derive(Debug, Default, Clone)]
pub struct MapLookup {
    targets: HashMap<String, Vec<u8>>,
}

impl MapLookup {
    pub fn new() -> Self {
        Self {
            targets: HashMap::new(),
        }
    }

    /// Add a known mapping
    pub fn insert(&mut self, id: ObjectId, target: TargetHash) {
        self.targets.insert(id.to_hex(), target.as_bytes().to_vec());
    }

    /// Load a JSON object of `"<source hex>": "<target hex>"` pairs
    pub fn from_json(json: &str) -> RehashResult<Self> {
        let raw: HashMap<String, String> = serde_json::from_str(json).map_err(|e| RehashError::ConfigValidation {
            field: "lookup.map".to_string(),
            reason: format!("invalid lookup map: {}", e),
        })?;

        let mut targets = HashMap::with_capacity(raw.len());
        for (source_hex, target_hex) in raw {
            let id = ObjectId::from_hex(&source_hex.to_ascii_lowercase())?;
            let bytes = decode_hex(&target_hex, target_hex.len() / 2)?;
            targets.insert(id.to_hex(), bytes);
        }
        Ok(Self { targets })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Lookup for MapLookup {
    async fn lookup(&mut self, source_hex: &str) -> RehashResult<Vec<u8>> {
        self.targets
            .get(source_hex)
            .cloned()
            .ok_or_else(|| RehashError::LookupFailure {
                hash: source_hex.to_string(),
                message: "hash not present in lookup map".to_string(),
                source: None,
            })
    }
}

/// Lookup backed by an async closure
pub struct FnLookup<F> {
    f: F,
}

impl<F, Fut> FnLookup<F>
where
    F: FnMut(String) -> Fut + Send,
    Fut: Future<Output = RehashResult<Vec<u8>>> + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> Lookup for FnLookup<F>
where
    F: FnMut(String) -> Fut + Send,
    Fut: Future<Output = RehashResult<Vec<u8>>> + Send,
{
    fn lookup(&mut self, source_hex: &str) -> impl Future<Output = RehashResult<Vec<u8>>> + Send {
        (self.f)(source_hex.to_string())
    }
}
