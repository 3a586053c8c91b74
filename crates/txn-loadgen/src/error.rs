//! Error types for the load generator.
//!
//! This module provides a unified error type [`LoadError`] covering transport
//! failures, terminal transaction outcomes, protocol violations and account
//! halting.

use crate::types::{Address, TransactionStatus};
use thiserror::Error;

/// A specialized Result type for load generator operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// The main error type for the load generator.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Error occurred during HTTP communication
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error occurred during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error occurred during URL parsing
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Error occurred during hex decoding
    #[error("Hex error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Error occurred during base64 decoding
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Invalid account address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid identifier (block or transaction ID)
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Invalid private key
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Signing the transaction envelope failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Transaction submission was rejected or could not be sent
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    /// API returned an error response
    #[error("API error ({status_code}): {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Transaction was sealed with an execution error
    #[error("Execution failed: {message}")]
    ExecutionFailed {
        /// The error message reported by the network
        message: String,
    },

    /// Transaction reached a terminal status other than sealed
    #[error("Transaction {status}: {id}")]
    TransactionFailed {
        /// The transaction ID
        id: String,
        /// The terminal status observed
        status: TransactionStatus,
    },

    /// A sealed transaction did not emit the event it must emit
    #[error("Missing event {event_type} in transaction {id}")]
    MissingEvent {
        /// The event type that was expected
        event_type: String,
        /// The transaction ID
        id: String,
    },

    /// An event was present but its payload could not be interpreted
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// The on-chain sequence number could not be fetched during a resync
    #[error("Sequence number resync failed for {address}: {message}")]
    ResyncFailed {
        /// The account being resynchronized
        address: Address,
        /// The underlying failure
        message: String,
    },

    /// The account stopped accepting submissions after a failed resync
    #[error("Account {0} is halted")]
    AccountHalted(Address),

    /// The completion channel closed before a result was delivered
    #[error("Submission result was dropped before completion")]
    CallbackDropped,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl LoadError {
    /// Creates a new API error from response details
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Returns true if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Api {
                status_code: 404,
                ..
            }
        )
    }

    /// Returns true if this is a transient error that might succeed on retry
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status_code, .. } => {
                matches!(status_code, 408 | 429 | 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }

    /// Returns true if the transaction reached the network and ended badly,
    /// as opposed to never leaving this process.
    pub fn is_terminal_outcome(&self) -> bool {
        matches!(
            self,
            Self::ExecutionFailed { .. } | Self::TransactionFailed { .. }
        )
    }

    /// Returns true if the run cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ResyncFailed { .. } | Self::AccountHalted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LoadError::InvalidAddress("bad address".to_string());
        assert_eq!(err.to_string(), "Invalid address: bad address");
    }

    #[test]
    fn test_is_not_found() {
        assert!(LoadError::api(404, "not found").is_not_found());
        assert!(!LoadError::api(500, "server error").is_not_found());
    }

    #[test]
    fn test_is_retryable() {
        assert!(LoadError::api(429, "rate limited").is_retryable());
        assert!(LoadError::api(503, "unavailable").is_retryable());
        assert!(LoadError::api(408, "timeout").is_retryable());
        assert!(!LoadError::api(400, "bad request").is_retryable());
        assert!(!LoadError::CallbackDropped.is_retryable());
    }

    #[test]
    fn test_terminal_outcomes() {
        let expired = LoadError::TransactionFailed {
            id: "0xab".to_string(),
            status: TransactionStatus::Expired,
        };
        assert!(expired.is_terminal_outcome());
        assert!(expired.to_string().contains("EXPIRED"));

        let failed = LoadError::ExecutionFailed {
            message: "insufficient balance".to_string(),
        };
        assert!(failed.is_terminal_outcome());
        assert!(!LoadError::api(500, "boom").is_terminal_outcome());
    }

    #[test]
    fn test_fatal_errors() {
        let address = Address::new([0, 0, 0, 0, 0, 0, 0, 1]);
        assert!(LoadError::AccountHalted(address).is_fatal());
        assert!(LoadError::ResyncFailed {
            address,
            message: "connection refused".to_string(),
        }
        .is_fatal());
        assert!(!LoadError::CallbackDropped.is_fatal());
    }

    #[test]
    fn test_missing_event_display() {
        let err = LoadError::MissingEvent {
            event_type: "flow.AccountCreated".to_string(),
            id: "0x01".to_string(),
        };
        assert!(err.to_string().contains("flow.AccountCreated"));
    }
}
