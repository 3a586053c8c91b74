//! Block headers, transaction results and events.

use crate::error::{LoadError, LoadResult};
use crate::types::{Address, Identifier};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Event type emitted when an account-creation transaction seals.
pub const ACCOUNT_CREATED_EVENT: &str = "flow.AccountCreated";

/// A sealed block header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block ID.
    pub id: Identifier,
    /// Parent block ID.
    pub parent_id: Identifier,
    /// Block height.
    pub height: u64,
}

/// Execution status of a submitted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// The network has no record of the transaction.
    Unknown,
    /// Accepted but not yet in a block.
    Pending,
    /// Included in a finalized block.
    Finalized,
    /// Executed but not yet sealed.
    Executed,
    /// Sealed; terminal.
    Sealed,
    /// Reference block fell out of the validity window; terminal.
    Expired,
}

impl TransactionStatus {
    /// Returns the upper-case name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Pending => "PENDING",
            Self::Finalized => "FINALIZED",
            Self::Executed => "EXECUTED",
            Self::Sealed => "SEALED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "pending" => Ok(Self::Pending),
            "finalized" => Ok(Self::Finalized),
            "executed" => Ok(Self::Executed),
            "sealed" => Ok(Self::Sealed),
            "expired" => Ok(Self::Expired),
            other => Err(LoadError::api(0, format!("unrecognized status {other}"))),
        }
    }
}

/// An event emitted by a transaction. The payload is JSON-Cadence.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Fully qualified event type.
    pub event_type: String,
    /// Decoded payload.
    pub payload: serde_json::Value,
}

impl Event {
    /// Returns the raw JSON value of the named field.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.payload
            .get("value")?
            .get("fields")?
            .as_array()?
            .iter()
            .find(|f| f.get("name").and_then(|n| n.as_str()) == Some(name))?
            .get("value")
    }

    /// Builds an account-created event for the given address.
    pub fn account_created(address: Address) -> Self {
        Self {
            event_type: ACCOUNT_CREATED_EVENT.to_string(),
            payload: serde_json::json!({
                "type": "Event",
                "value": {
                    "id": ACCOUNT_CREATED_EVENT,
                    "fields": [
                        { "name": "address", "value": { "type": "Address", "value": address.to_hex() } }
                    ]
                }
            }),
        }
    }
}

/// The network's view of a submitted transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionResult {
    /// Current status.
    pub status: TransactionStatus,
    /// Execution error, if any.
    pub error_message: Option<String>,
    /// Emitted events (populated once executed).
    pub events: Vec<Event>,
}

/// Where a polled transaction stands.
#[derive(Debug)]
pub enum Outcome {
    /// Keep polling.
    InProgress,
    /// Sealed without an execution error.
    Sealed(TransactionResult),
    /// Terminal failure.
    Failed(LoadError),
}

impl TransactionResult {
    /// A result with the given status and nothing else.
    pub fn with_status(status: TransactionStatus) -> Self {
        Self {
            status,
            error_message: None,
            events: Vec::new(),
        }
    }

    /// Classifies this result for the polling loop.
    pub fn outcome(self, id: &Identifier) -> Outcome {
        match self.status {
            TransactionStatus::Sealed => match self.error_message {
                Some(message) if !message.is_empty() => {
                    Outcome::Failed(LoadError::ExecutionFailed { message })
                }
                _ => Outcome::Sealed(self),
            },
            TransactionStatus::Expired | TransactionStatus::Unknown => {
                Outcome::Failed(LoadError::TransactionFailed {
                    id: id.to_hex(),
                    status: self.status,
                })
            }
            TransactionStatus::Pending
            | TransactionStatus::Finalized
            | TransactionStatus::Executed => Outcome::InProgress,
        }
    }

    /// Extracts the address from the first account-created event.
    pub fn created_address(&self, id: &Identifier) -> LoadResult<Address> {
        let event = self
            .events
            .iter()
            .find(|e| e.event_type == ACCOUNT_CREATED_EVENT)
            .ok_or_else(|| LoadError::MissingEvent {
                event_type: ACCOUNT_CREATED_EVENT.to_string(),
                id: id.to_hex(),
            })?;
        let value = event
            .field("address")
            .and_then(|v| v.get("value"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                LoadError::InvalidEvent(format!("{ACCOUNT_CREATED_EVENT} without address field"))
            })?;
        Address::from_hex(value)
    }
}
