//! # rehash-core
//!
//! Core types and utilities shared across all rehash crates.
//!
//! This crate provides:
//! - Object kinds and the `GitObject` unit moved between pipeline stages
//! - Source and target hash types with hex conversions
//! - `RehashError` for unified error handling
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (ObjectKind, GitObject, ObjectId, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Hex helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{RehashError, RehashResult};
pub use types::{GitObject, HashAlgorithm, ObjectId, ObjectKind, TargetHash};
