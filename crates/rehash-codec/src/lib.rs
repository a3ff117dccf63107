//! Dual hashing and object codecs for rehash
//!
//! This crate provides the pieces of the rewrite that work on a single
//! object at a time: computing source and target hashes, extracting the
//! references an object embeds, injecting target hashes next to them and
//! stripping them again for the reverse direction.

pub mod codec;
pub mod hasher;
pub mod reverse;

// Re-export main types
pub use codec::{parse_links, patch_content, Links, PatchLocation};
pub use hasher::{source_id, DualDigest, DualHasher, HashingReader, SourceHasher, TargetAccumulator, TargetSpec};
pub use reverse::restore_content;

use rehash_core::error::RehashError;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, RehashError>;
