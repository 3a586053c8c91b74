//! Access to the network.
//!
//! Everything the engine and scheduler know about the chain goes through the
//! [`ChainClient`] trait. [`RestChainClient`] talks to an access node over
//! HTTP; `MockChain` is an in-memory chain for tests.

#[cfg(test)]
mod mock;
mod rest;

#[cfg(test)]
pub use mock::{MockCall, MockChain, MockOutcome};
pub use rest::RestChainClient;

use crate::error::LoadResult;
use crate::types::{Address, BlockHeader, Identifier, Transaction, TransactionResult};
use async_trait::async_trait;

/// Network queries and transaction submission. We have this trait so the
/// submission engine can run against any access node, or none at all in
/// tests.
#[async_trait]
pub trait ChainClient: Send + Sync + 'static {
    /// Returns the latest sealed block header.
    async fn latest_block_header(&self) -> LoadResult<BlockHeader>;

    /// Returns the on-chain sequence number of an account key.
    async fn account_sequence_number(&self, address: Address, key_index: u32) -> LoadResult<u64>;

    /// Submits a signed transaction, returning its ID.
    async fn send_transaction(&self, transaction: &Transaction) -> LoadResult<Identifier>;

    /// Returns the current result of a submitted transaction.
    async fn transaction_result(&self, id: &Identifier) -> LoadResult<TransactionResult>;
}
