//! Core data types for object rewriting.
//!
//! This module provides the fundamental types used throughout rehash:
//! - Object kinds and buffered objects
//! - Source object ids and target hashes
//! - Target hash algorithm selection

pub mod hash;
pub mod object;

// Re-export all public types
pub use hash::{HashAlgorithm, ObjectId, TargetHash};
pub use object::{GitObject, ObjectKind};
