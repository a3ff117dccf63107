//! Utility functions and helpers.
//!
//! Common functionality used across multiple rehash crates.

pub mod hex;

// Re-export commonly used utilities
pub use self::hex::{decode_hex, is_lower_hex};
