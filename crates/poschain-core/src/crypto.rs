//! Block digests.
//!
//! Blocks are linked by SHA-256 digests carried on the wire as lowercase hex.
//! The genesis block has no predecessor; its `prevHash` is the empty string,
//! represented here by [`BlockHash::ZERO`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::CoreError;

/// A 32-byte SHA-256 block digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    /// Compute the SHA-256 digest of the given data.
    pub fn digest(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidHash(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidHash(format!("expected 32 bytes in {s:?}")))?;
        Ok(Self(arr))
    }

    /// Whether this is the "no predecessor" sentinel.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// The string form used both on the wire and as hash input.
    ///
    /// The sentinel renders as the empty string.
    pub fn to_wire_string(&self) -> String {
        if self.is_zero() {
            String::new()
        } else {
            self.to_hex()
        }
    }

    /// Parse the wire form produced by [`BlockHash::to_wire_string`].
    pub fn from_wire_str(s: &str) -> Result<Self, CoreError> {
        if s.is_empty() {
            Ok(Self::ZERO)
        } else {
            Self::from_hex(s)
        }
    }

    /// Sentinel for "no predecessor".
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            write!(f, "BlockHash(<none>)")
        } else {
            write!(f, "BlockHash({})", &self.to_hex()[..16])
        }
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire_string())
    }
}

impl AsRef<[u8]> for BlockHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for BlockHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire_string())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_wire_str(&s).map_err(serde::de::Error::custom)
    }
}
