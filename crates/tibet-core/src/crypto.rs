//! Content hashing for TIBET tokens.
//!
//! Wraps BLAKE3 with a strong type. The digest is kept in its hex form as
//! stored, so a damaged digest read back from disk is still representable
//! and simply fails verification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a rendered digest in hex characters.
pub const CONTENT_HASH_HEX_LEN: usize = 64;

/// A hex-encoded 256-bit BLAKE3 content digest.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Compute the BLAKE3 digest of the given data.
    pub fn compute(data: &[u8]) -> Self {
        Self(blake3::hash(data).to_hex().to_string())
    }

    /// Wrap an existing hex digest without checking it.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Get the digest as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the digest into raw bytes.
    ///
    /// Returns `None` when the stored string is not 64 hex characters.
    pub fn to_bytes(&self) -> Option<[u8; 32]> {
        if self.0.len() != CONTENT_HASH_HEX_LEN {
            return None;
        }
        let bytes = hex::decode(&self.0).ok()?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Some(arr)
    }

    /// Check that the digest is 64 lowercase hex characters.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == CONTENT_HASH_HEX_LEN
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.0.len().min(16);
        write!(f, "Blake3({})", self.0.get(..end).unwrap_or(&self.0))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
