//! Error types and result aliases for rehash operations.
//!
//! Every failure the rewrite engine can hit is fatal to the run. The only
//! self-healing behavior in the engine is dependency-driven re-attempts,
//! which are scheduling rather than error recovery, so nothing here is
//! ever retried.

use thiserror::Error;

/// Unified error type for all rehash operations
#[derive(Error, Debug)]
pub enum RehashError {
    // Object errors
    #[error("Unknown object kind '{kind}'")]
    UnknownObjectKind { kind: String },

    #[error("Malformed {kind} object: {reason}")]
    MalformedEncoding { kind: String, reason: String },

    #[error("Invalid hash: expected {expected}, got {actual}")]
    InvalidHash { expected: String, actual: String },

    // Resolution errors
    #[error("Lookup failed for {hash}: {message}")]
    LookupFailure {
        hash: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unresolvable dependency cycle between {hashes}")]
    DependencyCycle { hashes: String },

    // Stream errors
    #[error("Failed to read from object source: {message}")]
    UpstreamRead {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Rewrite aborted by consumer")]
    Aborted,

    #[error("Output sequence already ended")]
    OutputClosed,

    // Config errors
    #[error("Failed to parse rehash.toml: {message}")]
    TomlParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for rehash operations
pub type RehashResult<T> = Result<T, RehashError>;

impl RehashError {
    /// Create a malformed-encoding error for an object kind
    pub fn malformed(kind: impl ToString, reason: impl Into<String>) -> Self {
        Self::MalformedEncoding {
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a lookup failure wrapping the collaborator's error
    pub fn lookup<E>(hash: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::LookupFailure {
            hash: hash.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an upstream read error from any error type
    pub fn upstream<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::UpstreamRead {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            RehashError::UnknownObjectKind { .. } => {
                Some("Only blob, tree, commit and tag objects can be rewritten")
            },
            RehashError::LookupFailure { .. } => {
                Some("Pass a --lookup-map containing target hashes for objects missing from the input")
            },
            RehashError::MalformedEncoding { .. } => {
                Some("Check that the input was produced with the same target algorithm")
            },
            RehashError::ConfigValidation { .. } | RehashError::TomlParse { .. } => {
                Some("Check rehash.toml against the documented configuration keys")
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_lookup_error_keeps_source() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "no such hash");
        let err = RehashError::lookup("abc123", inner);

        assert_eq!(err.to_string(), "Lookup failed for abc123: no such hash");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_malformed_message() {
        let err = RehashError::malformed("tree", "missing NUL delimiter");
        assert_eq!(err.to_string(), "Malformed tree object: missing NUL delimiter");
        assert!(err.suggestion().is_some());
    }
}
