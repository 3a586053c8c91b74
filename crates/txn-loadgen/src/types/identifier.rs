//! Identifier type.
//!
//! A 32-byte SHA3-256 digest naming blocks and transactions.

use crate::error::{LoadError, LoadResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::str::FromStr;

/// The length of an identifier in bytes.
pub const IDENTIFIER_LENGTH: usize = 32;

/// A 32-byte block or transaction identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Identifier([u8; IDENTIFIER_LENGTH]);

impl Identifier {
    /// The "zero" identifier.
    pub const ZERO: Self = Self([0u8; IDENTIFIER_LENGTH]);

    /// Creates an identifier from a byte array.
    pub const fn new(bytes: [u8; IDENTIFIER_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Computes the SHA3-256 digest of the given data.
    pub fn sha3_256<T: AsRef<[u8]>>(data: T) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(data.as_ref());
        let result = hasher.finalize();
        let mut bytes = [0u8; IDENTIFIER_LENGTH];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }

    /// Parses an identifier from 64 hex characters (optional `0x` prefix).
    pub fn from_hex(hex_str: &str) -> LoadResult<Self> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        if hex_str.len() != IDENTIFIER_LENGTH * 2 {
            return Err(LoadError::InvalidIdentifier(format!(
                "expected {} hex characters, got {}",
                IDENTIFIER_LENGTH * 2,
                hex_str.len()
            )));
        }
        let bytes = hex::decode(hex_str)?;
        let mut id = [0u8; IDENTIFIER_LENGTH];
        id.copy_from_slice(&bytes);
        Ok(Self(id))
    }

    /// Returns the identifier as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the identifier as lowercase hex without prefix, the form the
    /// access API uses in paths and bodies.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.to_hex())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Identifier {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl rlp::Encodable for Identifier {
    fn rlp_append(&self, s: &mut rlp::RlpStream) {
        s.append(&self.0.to_vec());
    }
}
