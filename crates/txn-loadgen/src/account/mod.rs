//! Accounts and the root account that mints them.
//!
//! An [`Account`] is a cheap handle; clones share one submission engine, so
//! nonces stay consistent no matter which clone submits.

mod engine;
mod root;

pub use root::Root;

pub(crate) use engine::{HaltSignal, SubmissionEngine};

use crate::error::{LoadError, LoadResult};
use crate::factory::TransactionFactory;
use crate::types::{Address, Identifier, Transaction, TransactionResult};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{info, warn};

/// A transaction that reached the sealed state without an execution error.
#[derive(Clone, Debug, PartialEq)]
pub struct SealedTransaction {
    /// The transaction ID.
    pub id: Identifier,
    /// The sealed result.
    pub result: TransactionResult,
}

/// A funded account able to submit transactions.
#[derive(Clone)]
pub struct Account {
    engine: Arc<SubmissionEngine>,
    factory: Arc<dyn TransactionFactory>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address())
            .field("nonce", &self.nonce())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl Account {
    pub(crate) fn new(engine: Arc<SubmissionEngine>, factory: Arc<dyn TransactionFactory>) -> Self {
        Self { engine, factory }
    }

    pub(crate) fn engine(&self) -> &Arc<SubmissionEngine> {
        &self.engine
    }

    pub(crate) fn factory(&self) -> &Arc<dyn TransactionFactory> {
        &self.factory
    }

    /// The account's address.
    pub fn address(&self) -> Address {
        self.engine.address()
    }

    /// The next sequence number this account will assign.
    pub fn nonce(&self) -> u64 {
        self.engine.nonce()
    }

    /// Number of submissions between admission and a known result.
    pub fn in_flight(&self) -> usize {
        self.engine.in_flight()
    }

    /// Whether a nonce resync is queued or running.
    pub fn resync_pending(&self) -> bool {
        self.engine.resync_pending()
    }

    /// Whether the run this account belongs to has halted.
    pub fn is_halted(&self) -> bool {
        self.engine.halt().is_halted()
    }

    /// Signs and submits `transaction` with the next nonce.
    ///
    /// On `Ok`, exactly one of `on_sealed` and `on_failed` is called exactly
    /// once, from a background task. On `Err`, neither is.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::AccountHalted`] once the run has halted, or the
    /// error that stopped the transaction from reaching the network.
    pub async fn submit<S, F>(
        &self,
        transaction: Transaction,
        on_sealed: S,
        on_failed: F,
    ) -> LoadResult<Identifier>
    where
        S: FnOnce(TransactionResult) + Send + 'static,
        F: FnOnce(LoadError) + Send + 'static,
    {
        self.engine.submit(transaction, on_sealed, on_failed).await
    }

    /// Submits `transaction` and waits until it seals or fails.
    pub async fn submit_and_wait(&self, transaction: Transaction) -> LoadResult<SealedTransaction> {
        let (sender, receiver) = oneshot::channel();
        let on_failed_sender = Arc::new(Mutex::new(Some(sender)));
        let on_sealed_sender = on_failed_sender.clone();

        let id = self
            .submit(
                transaction,
                move |result| deliver(&on_sealed_sender, Ok(result)),
                move |e| deliver(&on_failed_sender, Err(e)),
            )
            .await?;

        let result = receiver.await.map_err(|_| LoadError::CallbackDropped)??;
        Ok(SealedTransaction { id, result })
    }

    /// Transfers `amount` token units to `to` and waits for the outcome.
    pub async fn send_tokens(&self, to: Address, amount: u64) -> LoadResult<SealedTransaction> {
        let transaction = self.factory.transfer(to, amount)?;
        match self.submit_and_wait(transaction).await {
            Ok(sealed) => {
                info!(
                    from = %self.address(),
                    to = %to,
                    amount,
                    txn_id = %sealed.id,
                    "Transfer sealed"
                );
                Ok(sealed)
            }
            Err(e) => {
                warn!(
                    from = %self.address(),
                    to = %to,
                    amount,
                    error = %e,
                    "Transfer failed"
                );
                Err(e)
            }
        }
    }
}

type ResultSender = oneshot::Sender<LoadResult<TransactionResult>>;

fn deliver(sender: &Mutex<Option<ResultSender>>, result: LoadResult<TransactionResult>) {
    let sender = sender.lock().ok().and_then(|mut slot| slot.take());
    if let Some(sender) = sender {
        // The waiter may have been dropped; nothing to do then.
        let _ = sender.send(result);
    }
}
