//! In-memory chain for tests.

use crate::client::ChainClient;
use crate::error::{LoadError, LoadResult};
use crate::types::{
    Address, BlockHeader, Event, Identifier, Transaction, TransactionResult, TransactionStatus,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// How the mock settles one transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockOutcome {
    /// Sealed successfully. The proposer's on-chain sequence number advances.
    Seal,
    /// Sealed with an execution error. The sequence number still advances.
    Revert(String),
    /// Expired before inclusion.
    Expire,
    /// The network forgot the transaction.
    Unknown,
    /// Every poll fails with a transport error.
    PollError,
    /// Never leaves the pending state.
    Pending,
}

/// A call observed by the mock, in the order it was served.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockCall {
    /// A sequence number was read.
    SequenceNumber {
        /// Account queried.
        address: Address,
        /// Value returned.
        value: u64,
    },
    /// A transaction was accepted.
    Send {
        /// Proposer.
        address: Address,
        /// Proposal sequence number.
        nonce: u64,
    },
    /// A transaction result reached a terminal state.
    Settled {
        /// Proposer.
        address: Address,
        /// Proposal sequence number.
        nonce: u64,
    },
}

#[derive(Debug)]
struct Submitted {
    address: Address,
    nonce: u64,
    polls: u32,
    settled: bool,
}

#[derive(Debug, Default)]
struct MockState {
    height: u64,
    sequence_numbers: HashMap<Address, u64>,
    outcomes: HashMap<(Address, u64), MockOutcome>,
    submitted: HashMap<Identifier, Submitted>,
    transactions: Vec<Transaction>,
    journal: Vec<MockCall>,
    next_address: u64,
    pending_polls: u32,
    fail_headers: bool,
    fail_sequence_numbers: bool,
    failing_sends: usize,
    known_addresses: HashSet<Address>,
}

/// A [`ChainClient`] backed by process memory.
///
/// Every transaction seals on its first poll unless an outcome was scripted
/// for its proposer and sequence number. Every sealed result carries an
/// account-created event for a freshly minted address.
#[derive(Debug, Default)]
pub struct MockChain {
    state: Mutex<MockState>,
}

impl MockChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sets an account's on-chain sequence number.
    pub fn set_sequence_number(&self, address: Address, sequence_number: u64) {
        self.state().sequence_numbers.insert(address, sequence_number);
    }

    /// Returns an account's on-chain sequence number.
    pub fn sequence_number(&self, address: Address) -> u64 {
        self.state()
            .sequence_numbers
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    /// Scripts the outcome of the transaction proposed by `address` with
    /// sequence number `nonce`.
    pub fn set_outcome(&self, address: Address, nonce: u64, outcome: MockOutcome) {
        self.state().outcomes.insert((address, nonce), outcome);
    }

    /// Number of `Pending` polls before a transaction settles.
    pub fn set_pending_polls(&self, polls: u32) {
        self.state().pending_polls = polls;
    }

    /// Makes header reads fail.
    pub fn fail_headers(&self, fail: bool) {
        self.state().fail_headers = fail;
    }

    /// Makes sequence number reads fail.
    pub fn fail_sequence_numbers(&self, fail: bool) {
        self.state().fail_sequence_numbers = fail;
    }

    /// Rejects the next `count` submissions.
    pub fn fail_next_sends(&self, count: usize) {
        self.state().failing_sends = count;
    }

    /// Transactions accepted so far, in acceptance order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.state().transactions.clone()
    }

    /// Sequence numbers of transactions accepted from `address`, in acceptance
    /// order.
    pub fn nonces(&self, address: Address) -> Vec<u64> {
        self.state()
            .transactions
            .iter()
            .filter(|t| t.proposal_key.address == address)
            .map(|t| t.proposal_key.sequence_number)
            .collect()
    }

    /// Every call served so far.
    pub fn journal(&self) -> Vec<MockCall> {
        self.state().journal.clone()
    }

    /// Number of sequence number reads served for `address`.
    pub fn sequence_number_reads(&self, address: Address) -> usize {
        self.state()
            .journal
            .iter()
            .filter(|c| matches!(c, MockCall::SequenceNumber { address: a, .. } if *a == address))
            .count()
    }

    /// Addresses minted by account-created events.
    pub fn created_accounts(&self) -> usize {
        self.state().known_addresses.len()
    }
}

impl MockState {
    fn mint_address(&mut self) -> Address {
        self.next_address += 1;
        let mut bytes = [0u8; 8];
        bytes[0] = 0xaa;
        bytes[1..].copy_from_slice(&self.next_address.to_be_bytes()[1..]);
        let address = Address::new(bytes);
        self.known_addresses.insert(address);
        address
    }

    fn advance(&mut self, address: Address, nonce: u64) {
        let current = self.sequence_numbers.entry(address).or_insert(0);
        *current = (*current).max(nonce + 1);
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn latest_block_header(&self) -> LoadResult<BlockHeader> {
        let mut state = self.state();
        if state.fail_headers {
            return Err(LoadError::api(503, "headers unavailable"));
        }
        state.height += 1;
        let height = state.height;
        Ok(BlockHeader {
            id: Identifier::sha3_256(height.to_be_bytes()),
            parent_id: Identifier::sha3_256((height - 1).to_be_bytes()),
            height,
        })
    }

    async fn account_sequence_number(&self, address: Address, _key_index: u32) -> LoadResult<u64> {
        let mut state = self.state();
        if state.fail_sequence_numbers {
            return Err(LoadError::api(500, "sequence number unavailable"));
        }
        let value = state.sequence_numbers.get(&address).copied().unwrap_or(0);
        state.journal.push(MockCall::SequenceNumber { address, value });
        Ok(value)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> LoadResult<Identifier> {
        let mut state = self.state();
        if state.failing_sends > 0 {
            state.failing_sends -= 1;
            return Err(LoadError::SubmissionFailed("rejected by mock".to_string()));
        }

        let id = transaction.id();
        let address = transaction.proposal_key.address;
        let nonce = transaction.proposal_key.sequence_number;
        state.submitted.insert(
            id,
            Submitted {
                address,
                nonce,
                polls: 0,
                settled: false,
            },
        );
        state.transactions.push(transaction.clone());
        state.journal.push(MockCall::Send { address, nonce });
        Ok(id)
    }

    async fn transaction_result(&self, id: &Identifier) -> LoadResult<TransactionResult> {
        let mut state = self.state();
        let pending_polls = state.pending_polls;
        let (address, nonce, polls) = match state.submitted.get_mut(id) {
            Some(submitted) => {
                submitted.polls += 1;
                (submitted.address, submitted.nonce, submitted.polls)
            }
            None => return Ok(TransactionResult::with_status(TransactionStatus::Unknown)),
        };

        let outcome = state
            .outcomes
            .get(&(address, nonce))
            .cloned()
            .unwrap_or(MockOutcome::Seal);
        if outcome == MockOutcome::PollError {
            return Err(LoadError::api(502, "bad gateway"));
        }
        if polls <= pending_polls || outcome == MockOutcome::Pending {
            return Ok(TransactionResult::with_status(TransactionStatus::Pending));
        }

        let first_settle = state
            .submitted
            .get_mut(id)
            .map(|s| !std::mem::replace(&mut s.settled, true))
            .unwrap_or(false);
        if first_settle {
            state.journal.push(MockCall::Settled { address, nonce });
        }

        let result = match outcome {
            MockOutcome::Seal => {
                if first_settle {
                    state.advance(address, nonce);
                }
                let created = state.mint_address();
                let mut result = TransactionResult::with_status(TransactionStatus::Sealed);
                result.events.push(Event::account_created(created));
                result
            }
            MockOutcome::Revert(message) => {
                if first_settle {
                    state.advance(address, nonce);
                }
                let mut result = TransactionResult::with_status(TransactionStatus::Sealed);
                result.error_message = Some(message);
                result
            }
            MockOutcome::Expire => TransactionResult::with_status(TransactionStatus::Expired),
            MockOutcome::Unknown | MockOutcome::PollError | MockOutcome::Pending => {
                TransactionResult::with_status(TransactionStatus::Unknown)
            }
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Outcome;

    fn proposed(address: Address, nonce: u64) -> Transaction {
        let mut txn = Transaction::new().with_script("transaction {}");
        txn.set_payer(address).set_proposal_key(address, 0, nonce);
        txn
    }

    #[tokio::test]
    async fn test_seal_advances_sequence_number() {
        let chain = MockChain::new();
        let address = Address::from_hex("0x01").unwrap();
        chain.set_sequence_number(address, 5);

        let id = chain.send_transaction(&proposed(address, 5)).await.unwrap();
        let result = chain.transaction_result(&id).await.unwrap();
        assert!(matches!(result.outcome(&id), Outcome::Sealed(_)));
        assert_eq!(chain.sequence_number(address), 6);
        assert_eq!(chain.nonces(address), vec![5]);
    }

    #[tokio::test]
    async fn test_scripted_outcomes() {
        let chain = MockChain::new();
        let address = Address::from_hex("0x01").unwrap();
        chain.set_outcome(address, 0, MockOutcome::Expire);
        chain.set_outcome(address, 1, MockOutcome::PollError);
        chain.set_pending_polls(1);

        let expired = chain.send_transaction(&proposed(address, 0)).await.unwrap();
        assert_eq!(
            chain.transaction_result(&expired).await.unwrap().status,
            TransactionStatus::Pending
        );
        assert_eq!(
            chain.transaction_result(&expired).await.unwrap().status,
            TransactionStatus::Expired
        );
        assert_eq!(chain.sequence_number(address), 0);

        let broken = chain.send_transaction(&proposed(address, 1)).await.unwrap();
        assert!(chain.transaction_result(&broken).await.is_err());

        chain.set_outcome(address, 2, MockOutcome::Pending);
        let stuck = chain.send_transaction(&proposed(address, 2)).await.unwrap();
        for _ in 0..5 {
            assert_eq!(
                chain.transaction_result(&stuck).await.unwrap().status,
                TransactionStatus::Pending
            );
        }
        assert!(!chain
            .journal()
            .contains(&MockCall::Settled { address, nonce: 2 }));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let chain = MockChain::new();
        let address = Address::from_hex("0x01").unwrap();

        chain.fail_next_sends(1);
        assert!(chain.send_transaction(&proposed(address, 0)).await.is_err());
        assert!(chain.send_transaction(&proposed(address, 0)).await.is_ok());

        chain.fail_headers(true);
        assert!(chain.latest_block_header().await.is_err());
        chain.fail_sequence_numbers(true);
        assert!(chain.account_sequence_number(address, 0).await.is_err());
    }
}
