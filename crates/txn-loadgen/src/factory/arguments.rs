//! JSON-Cadence encoding of script arguments.

use crate::error::{LoadError, LoadResult};
use crate::types::Address;
use serde_json::json;
use std::fmt;

/// Fixed-point token amount with eight decimal places, stored in the smallest
/// unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct UFix64(u64);

impl UFix64 {
    /// Number of smallest units in one whole token.
    pub const SCALE: u64 = 100_000_000;

    /// Builds an amount from a whole part and a fractional part in smallest
    /// units. Saturates instead of overflowing.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Config`] if `fraction` is a whole token or more.
    pub fn from_parts(integer: u64, fraction: u64) -> LoadResult<Self> {
        if fraction >= Self::SCALE {
            return Err(LoadError::Config(format!(
                "fractional amount {fraction} must be below {}",
                Self::SCALE
            )));
        }
        Ok(Self(
            integer.saturating_mul(Self::SCALE).saturating_add(fraction),
        ))
    }

    /// Returns the amount in smallest units.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UFix64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:08}", self.0 / Self::SCALE, self.0 % Self::SCALE)
    }
}

/// A script argument value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CadenceValue {
    /// A string.
    String(String),
    /// A fixed-point amount.
    UFix64(UFix64),
    /// An account address.
    Address(Address),
}

impl CadenceValue {
    /// Encodes the value as JSON-Cadence bytes.
    pub fn encode(&self) -> LoadResult<Vec<u8>> {
        let value = match self {
            Self::String(s) => json!({ "type": "String", "value": s }),
            Self::UFix64(amount) => json!({ "type": "UFix64", "value": amount.to_string() }),
            Self::Address(address) => json!({ "type": "Address", "value": address.to_hex() }),
        };
        Ok(serde_json::to_vec(&value)?)
    }
}
