//! Configuration parsing for rehash
//!
//! This crate handles parsing and validation of rehash.toml files and the
//! layering of environment and command line overrides on top of them.

pub mod merge;
pub mod toml;

// Re-export main types
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource};
pub use self::toml::{LookupSection, OutputFormat, OutputSection, RehashToml, TargetSection};

use rehash_core::error::RehashError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, RehashError>;

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "rehash.toml";
