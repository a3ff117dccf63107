//! Source and target hash types.
//!
//! Two hash spaces exist per run: the fixed 20-byte source space and the
//! configurable target space. `ObjectId` is the source side and is used as
//! the key of every resolver map; `TargetHash` carries whatever width the
//! configured algorithm produces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RehashError;
use crate::utils::hex::decode_hex;

/// A 20-byte source object id
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    /// The raw hash bytes
    bytes: [u8; ObjectId::LEN],
}

impl ObjectId {
    /// Width of a source hash in bytes
    pub const LEN: usize = 20;
    /// Width of a source hash in hex characters
    pub const HEX_LEN: usize = Self::LEN * 2;

    /// Create a new ObjectId from raw bytes
    pub fn new(bytes: [u8; Self::LEN]) -> Self {
        Self { bytes }
    }

    /// Create an ObjectId from a slice of exactly 20 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RehashError> {
        let bytes: [u8; Self::LEN] = bytes.try_into().map_err(|_| RehashError::InvalidHash {
            expected: format!("{} bytes", Self::LEN),
            actual: format!("{} bytes", bytes.len()),
        })?;
        Ok(Self { bytes })
    }

    /// Create an ObjectId from a hexadecimal string
    pub fn from_hex(hex_str: &str) -> Result<Self, RehashError> {
        let bytes = decode_hex(hex_str, Self::LEN)?;
        Self::from_slice(&bytes)
    }

    /// Convert id to lowercase hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Raw bytes as written into tree records
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.bytes
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = RehashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// A target hash of configurable width
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TargetHash(Vec<u8>);

impl TargetHash {
    /// Wrap raw digest bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Parse a hex target hash of the given width
    pub fn from_hex(hex_str: &str, width: usize) -> Result<Self, RehashError> {
        decode_hex(hex_str, width).map(Self)
    }

    /// Convert hash to lowercase hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Width in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TargetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for TargetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetHash({})", self.to_hex())
    }
}

/// Algorithm used for the target hash space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha1,
    #[default]
    Sha256,
    Sha512,
    Blake3,
}

impl HashAlgorithm {
    /// Digest width in bytes
    pub fn width(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha512 => 64,
            HashAlgorithm::Blake3 => 32,
        }
    }

    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = RehashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "blake3" => Ok(HashAlgorithm::Blake3),
            _ => Err(RehashError::ConfigValidation {
                field: "algorithm".to_string(),
                reason: format!("unsupported hash algorithm '{}'", s),
            }),
        }
    }
}
