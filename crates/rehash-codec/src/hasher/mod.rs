//! Dual hashing of object content
//!
//! The source accumulator reproduces the source store's self-addressing
//! scheme: SHA-1 over `"<kind> <declared_length>\0"` followed by the
//! content. The target accumulator runs the configured algorithm over the
//! bytes that are actually emitted, with no header.

use rehash_core::types::object::source_header;
use rehash_core::{HashAlgorithm, ObjectId, ObjectKind, TargetHash};
use sha1::{Digest, Sha1};
use sha2::{Sha256, Sha512};

pub mod reader;

pub use reader::HashingReader;

/// SHA-1 accumulator seeded with the source header
#[derive(Clone)]
pub struct SourceHasher {
    inner: Sha1,
}

impl SourceHasher {
    /// Start hashing an object of the given kind and declared length
    pub fn new(kind: ObjectKind, declared_length: u64) -> Self {
        let mut inner = Sha1::new();
        inner.update(source_header(kind, declared_length));
        Self { inner }
    }

    /// Feed content bytes
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finish and return the source object id
    pub fn finalize(self) -> ObjectId {
        let digest = self.inner.finalize();
        let mut bytes = [0u8; ObjectId::LEN];
        bytes.copy_from_slice(&digest);
        ObjectId::new(bytes)
    }
}

/// Accumulator for the configured target algorithm
#[derive(Clone)]
pub enum TargetAccumulator {
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl TargetAccumulator {
    /// Fresh accumulator for an algorithm
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha1 => TargetAccumulator::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => TargetAccumulator::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => TargetAccumulator::Sha512(Sha512::new()),
            HashAlgorithm::Blake3 => TargetAccumulator::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    /// Algorithm this accumulator computes
    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            TargetAccumulator::Sha1(_) => HashAlgorithm::Sha1,
            TargetAccumulator::Sha256(_) => HashAlgorithm::Sha256,
            TargetAccumulator::Sha512(_) => HashAlgorithm::Sha512,
            TargetAccumulator::Blake3(_) => HashAlgorithm::Blake3,
        }
    }

    /// Digest width in bytes
    pub fn width(&self) -> usize {
        self.algorithm().width()
    }

    /// Feed bytes
    pub fn update(&mut self, data: &[u8]) {
        match self {
            TargetAccumulator::Sha1(h) => h.update(data),
            TargetAccumulator::Sha256(h) => h.update(data),
            TargetAccumulator::Sha512(h) => h.update(data),
            TargetAccumulator::Blake3(h) => {
                h.update(data);
            }
        }
    }

    /// Finish and return the target hash
    pub fn finalize(self) -> TargetHash {
        let bytes = match self {
            TargetAccumulator::Sha1(h) => h.finalize().to_vec(),
            TargetAccumulator::Sha256(h) => h.finalize().to_vec(),
            TargetAccumulator::Sha512(h) => h.finalize().to_vec(),
            TargetAccumulator::Blake3(h) => h.finalize().as_bytes().to_vec(),
        };
        TargetHash::new(bytes)
    }

    /// One-shot target hash of a buffer
    pub fn digest(algorithm: HashAlgorithm, data: &[u8]) -> TargetHash {
        let mut acc = Self::new(algorithm);
        acc.update(data);
        acc.finalize()
    }
}

/// How the target side of a dual hasher is specified
#[derive(Clone)]
pub enum TargetSpec {
    /// Start a fresh accumulator for this algorithm
    Algorithm(HashAlgorithm),
    /// Continue an accumulator the caller already initialized
    Accumulator(TargetAccumulator),
}

impl TargetSpec {
    fn into_accumulator(self) -> TargetAccumulator {
        match self {
            TargetSpec::Algorithm(algorithm) => TargetAccumulator::new(algorithm),
            TargetSpec::Accumulator(acc) => acc,
        }
    }
}

impl From<HashAlgorithm> for TargetSpec {
    fn from(algorithm: HashAlgorithm) -> Self {
        TargetSpec::Algorithm(algorithm)
    }
}

impl From<TargetAccumulator> for TargetSpec {
    fn from(acc: TargetAccumulator) -> Self {
        TargetSpec::Accumulator(acc)
    }
}

/// Both digests of one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualDigest {
    pub source: ObjectId,
    pub target: TargetHash,
}

/// Runs the source and target accumulators over the same bytes
#[derive(Clone)]
pub struct DualHasher {
    source: SourceHasher,
    target: TargetAccumulator,
}

impl DualHasher {
    /// Create a dual hasher for one object
    pub fn new(kind: ObjectKind, declared_length: u64, target: impl Into<TargetSpec>) -> Self {
        Self {
            source: SourceHasher::new(kind, declared_length),
            target: target.into().into_accumulator(),
        }
    }

    /// Feed bytes to both accumulators
    pub fn update(&mut self, data: &[u8]) {
        self.source.update(data);
        self.target.update(data);
    }

    /// Finish both accumulators
    pub fn finalize(self) -> DualDigest {
        DualDigest {
            source: self.source.finalize(),
            target: self.target.finalize(),
        }
    }
}

/// Source id of a complete buffer
pub fn source_id(kind: ObjectKind, declared_length: u64, content: &[u8]) -> ObjectId {
    let mut hasher = SourceHasher::new(kind, declared_length);
    hasher.update(content);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_matches_git() {
        let id = source_id(ObjectKind::Blob, 12, b"hello world\n");
        assert_eq!(id.to_hex(), "3b18e512dba79e4c8300dd08aeb37f8e728b8dad");

        let empty_tree = source_id(ObjectKind::Tree, 0, b"");
        assert_eq!(empty_tree.to_hex(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }

    #[test]
    fn test_dual_hasher_blob() {
        let mut hasher = DualHasher::new(ObjectKind::Blob, 2, HashAlgorithm::Sha256);
        hasher.update(b"h");
        hasher.update(b"i");
        let digest = hasher.finalize();

        assert_eq!(digest.source.to_hex(), "32f95c0d1244a78b2be1bab8de17906fabb2c4a8");
        assert_eq!(
            digest.target.to_hex(),
            "8f434346648f6b96df89dda901c5176b10a6d83961dd3c1ac88b59b2dc327aa4"
        );
    }

    #[test]
    fn test_target_has_no_header() {
        // sha1 as target algorithm hashes raw content, unlike the source side
        let digest = TargetAccumulator::digest(HashAlgorithm::Sha1, b"hi");
        assert_eq!(digest.to_hex(), "c22b5f9178342609428d6f51b2c5af4c0bde6a42");
    }

    #[test]
    fn test_target_widths() {
        for algorithm in [
            HashAlgorithm::Sha1,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha512,
            HashAlgorithm::Blake3,
        ] {
            let digest = TargetAccumulator::digest(algorithm, b"content");
            assert_eq!(digest.len(), algorithm.width());
        }
    }

    #[test]
    fn test_preinitialized_accumulator() {
        let mut acc = TargetAccumulator::new(HashAlgorithm::Sha256);
        acc.update(b"h");

        let mut hasher = DualHasher::new(ObjectKind::Blob, 2, acc);
        hasher.update(b"i");
        let digest = hasher.finalize();

        // The accumulator already saw "h", the source side did not
        assert_eq!(digest.target, TargetAccumulator::digest(HashAlgorithm::Sha256, b"hi"));
        assert_eq!(digest.source, source_id(ObjectKind::Blob, 2, b"i"));
    }
}
