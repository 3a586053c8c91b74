//! Core network types.

mod address;
mod identifier;
mod result;
mod transaction;

pub use address::{Address, ADDRESS_LENGTH};
pub use identifier::{Identifier, IDENTIFIER_LENGTH};
pub use result::{
    BlockHeader, Event, Outcome, TransactionResult, TransactionStatus, ACCOUNT_CREATED_EVENT,
};
pub use transaction::{
    ProposalKey, Transaction, TransactionSignature, DEFAULT_GAS_LIMIT, TRANSACTION_DOMAIN_TAG,
};
