//! Shared types and identifiers for Orbit.
//!
//! This crate defines the core types used across the Orbit workspace:
//! ring identifiers ([`Identifier`]), ring nodes ([`Node`]), the digest
//! functions that map keys onto the ring ([`HashFunc`]), and the
//! fault-tolerance arithmetic in [`quorum`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

pub mod quorum;

// ---------------------------------------------------------------------------
// Identifier
// ---------------------------------------------------------------------------

/// A position on the ring.
///
/// Identifiers are fixed-width byte strings (the width is the digest output
/// size) interpreted as big-endian unsigned integers modulo `2^(8 * width)`.
/// For identifiers of equal width, byte-lexicographic ordering is the same as
/// integer ordering, which is what the derived `Ord` provides.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(Vec<u8>);

impl Identifier {
    /// The all-zero identifier of the given width.
    pub fn zero(width: usize) -> Self {
        Self(vec![0u8; width])
    }

    /// The all-ones identifier of the given width (the top of the ring).
    pub fn max(width: usize) -> Self {
        Self(vec![0xffu8; width])
    }

    /// Return the raw big-endian bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Width in bytes.
    pub fn width(&self) -> usize {
        self.0.len()
    }

    /// Consume the identifier and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// The next identifier clockwise: `self + 1 mod 2^(8 * width)`.
    pub fn wrapping_next(&self) -> Self {
        let mut bytes = self.0.clone();
        for byte in bytes.iter_mut().rev() {
            let (sum, carry) = byte.overflowing_add(1);
            *byte = sum;
            if !carry {
                break;
            }
        }
        Self(bytes)
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, IdentifierError> {
        let bytes = hex::decode(s).map_err(|e| IdentifierError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// First eight hex characters, for log lines.
    pub fn short(&self) -> String {
        let hex = self.to_hex();
        hex[..hex.len().min(8)].to_string()
    }
}

impl From<Vec<u8>> for Identifier {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Identifier {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Identifier {
    fn from(bytes: [u8; N]) -> Self {
        Self(bytes.to_vec())
    }
}

impl AsRef<[u8]> for Identifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({self})")
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Human-readable formats (JSON, TOML) carry identifiers as lowercase hex;
// binary formats (postcard) carry the raw bytes.
impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            Ok(Self(Vec::<u8>::deserialize(deserializer)?))
        }
    }
}

/// Errors produced when parsing identifiers or digest names.
#[derive(Debug, thiserror::Error)]
pub enum IdentifierError {
    /// The input was not valid hex.
    #[error("invalid hex identifier: {0}")]
    InvalidHex(String),

    /// The digest function name is not recognised.
    #[error("unknown hash function: {0}")]
    UnknownHashFunc(String),
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A node on the ring as reported by the successor-lookup primitive.
///
/// Nodes are owned by the ring; Orbit only reads the identifier and host.
/// Several nodes (virtual nodes) may share one host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    /// Position of this node on the ring.
    pub id: Identifier,
    /// Network address of the physical host serving this node.
    pub host: String,
}

impl Node {
    /// Create a node descriptor.
    pub fn new(id: impl Into<Identifier>, host: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id.short(), self.host)
    }
}

// ---------------------------------------------------------------------------
// Digest functions
// ---------------------------------------------------------------------------

/// Digest function used to place keys on the ring.
///
/// The digest output width determines the identifier width of the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashFunc {
    /// SHA-256 (32-byte identifiers).
    #[default]
    Sha256,
    /// BLAKE3 (32-byte identifiers).
    Blake3,
}

impl HashFunc {
    /// Digest `data` into a ring identifier.
    pub fn digest(&self, data: &[u8]) -> Identifier {
        match self {
            HashFunc::Sha256 => Identifier(Sha256::digest(data).to_vec()),
            HashFunc::Blake3 => Identifier(blake3::hash(data).as_bytes().to_vec()),
        }
    }

    /// Identifier width in bytes produced by this digest.
    pub fn width(&self) -> usize {
        match self {
            HashFunc::Sha256 | HashFunc::Blake3 => 32,
        }
    }
}

impl fmt::Display for HashFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashFunc::Sha256 => f.write_str("sha256"),
            HashFunc::Blake3 => f.write_str("blake3"),
        }
    }
}

impl FromStr for HashFunc {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(HashFunc::Sha256),
            "blake3" => Ok(HashFunc::Blake3),
            other => Err(IdentifierError::UnknownHashFunc(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
