//! Dependency-aware rewrite engine for rehash
//!
//! This crate turns a stream of source-format objects into their dual form.
//! Objects whose references are not yet known are parked until the hashes
//! they need show up, either later in the stream or from an external lookup
//! once the input ends. Finished objects leave through an ordered output
//! queue in the order they were resolved.

pub mod cache;
pub mod engine;
pub mod index;
pub mod lookup;
pub mod output;
pub mod restore;
pub mod source;

// Re-export main types
pub use cache::HashCache;
pub use engine::{rewrite_objects, spawn_rewrite, Resolver, RewriteStats};
pub use index::{DependencyIndex, EntryId, PendingEntry};
pub use lookup::{FnLookup, Lookup, MapLookup, NoLookup};
pub use output::{OutputSequencer, OutputStream};
pub use restore::{restore_objects, spawn_restore, Restorer};
pub use source::{ChannelSource, IterSource, ObjectSource};

use rehash_core::error::RehashError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, RehashError>;
