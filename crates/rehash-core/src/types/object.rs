//! Object kinds and the buffered object unit.
//!
//! A `GitObject` is what flows between pipeline stages: the kind, the
//! length used in the source hash header and the full content.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RehashError;

/// Kind of a content-addressed object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Opaque file content, no references
    Blob,
    /// Directory listing of binary records
    Tree,
    /// Snapshot with tree and parent references
    Commit,
    /// Annotated tag pointing at another object
    Tag,
}

impl ObjectKind {
    /// All kinds the rewriter understands
    pub const ALL: [ObjectKind; 4] = [
        ObjectKind::Blob,
        ObjectKind::Tree,
        ObjectKind::Commit,
        ObjectKind::Tag,
    ];

    /// Name used in the source hash header
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
            ObjectKind::Tag => "tag",
        }
    }

    /// Whether objects of this kind embed references to other objects
    pub fn has_links(&self) -> bool {
        !matches!(self, ObjectKind::Blob)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = RehashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blob" => Ok(ObjectKind::Blob),
            "tree" => Ok(ObjectKind::Tree),
            "commit" => Ok(ObjectKind::Commit),
            "tag" => Ok(ObjectKind::Tag),
            other => Err(RehashError::UnknownObjectKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// A fully buffered object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitObject {
    /// Object kind
    pub kind: ObjectKind,
    /// Length written into the source hash header.
    ///
    /// Always the source-format length, also for rewritten objects.
    pub declared_length: u64,
    /// Object content
    pub content: Vec<u8>,
}

impl GitObject {
    /// Create an object whose declared length is its content length
    pub fn new(kind: ObjectKind, content: impl Into<Vec<u8>>) -> Self {
        let content = content.into();
        Self {
            kind,
            declared_length: content.len() as u64,
            content,
        }
    }

    /// Create an object with an explicit declared length
    pub fn with_length(kind: ObjectKind, declared_length: u64, content: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            declared_length,
            content: content.into(),
        }
    }

    /// Convenience constructor for blobs
    pub fn blob(content: impl Into<Vec<u8>>) -> Self {
        Self::new(ObjectKind::Blob, content)
    }

    /// Source hash header: `"<kind> <declared_length>\0"`
    pub fn header(&self) -> Vec<u8> {
        source_header(self.kind, self.declared_length)
    }
}

/// Build the source hash header for a kind and length
pub fn source_header(kind: ObjectKind, declared_length: u64) -> Vec<u8> {
    let mut header = format!("{} {}", kind, declared_length).into_bytes();
    header.push(0);
    header
}
