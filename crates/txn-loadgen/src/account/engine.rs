//! Nonce-sequenced submission for a single account.
//!
//! Many transactions from one account can be in flight at once. Each
//! submission holds a shared slot on the account's gate from admission until
//! its result is known. When a submission ends badly the local nonce can no
//! longer be trusted, so a resync takes the gate exclusively: new admissions
//! wait, every in-flight slot drains, and the nonce is overwritten with the
//! network's value before the gate reopens.
//!
//! The gate is a [`tokio::sync::RwLock`], which queues fairly, so once a
//! resync is waiting no new submission can slip in ahead of it.

use crate::client::ChainClient;
use crate::config::AccountOptions;
use crate::crypto::Signer;
use crate::error::{LoadError, LoadResult};
use crate::retry::{RetryConfig, RetryExecutor, RetryScope};
use crate::types::{Address, Identifier, Outcome, Transaction, TransactionResult};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedRwLockReadGuard, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Run-wide halt signal, shared by a root and every account it mints. Fired
/// when an account's nonce can no longer be recovered.
#[derive(Debug, Default)]
pub(crate) struct HaltSignal {
    token: CancellationToken,
    reason: Mutex<Option<LoadError>>,
}

impl HaltSignal {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn is_halted(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Records the first reason and fires the signal.
    fn halt(&self, reason: LoadError) {
        if let Ok(mut slot) = self.reason.lock() {
            if slot.is_none() {
                *slot = Some(reason);
            }
        }
        self.token.cancel();
    }

    /// Takes the recorded reason, falling back to a generic halt of `address`.
    pub(crate) fn take_reason(&self, address: Address) -> LoadError {
        self.reason
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .unwrap_or(LoadError::AccountHalted(address))
    }
}

/// A shared hold on the gate for one submission. Dropping it releases the
/// hold and the in-flight count.
struct Slot {
    _guard: OwnedRwLockReadGuard<()>,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) struct SubmissionEngine {
    /// Account address. Never changes.
    address: Address,
    /// Key index used for the proposal key and the envelope signature.
    key_index: u32,
    signer: Box<dyn Signer>,
    client: Arc<dyn ChainClient>,
    poll_interval: Duration,
    resync_retry: RetryConfig,
    /// Next sequence number to assign.
    nonce: AtomicU64,
    /// Submissions read, resync writes.
    gate: Arc<RwLock<()>>,
    in_flight: Arc<AtomicUsize>,
    /// Set from the first resync request until that resync finishes.
    resync_requested: AtomicBool,
    halt: Arc<HaltSignal>,
}

impl SubmissionEngine {
    pub(crate) fn new(
        address: Address,
        signer: Box<dyn Signer>,
        starting_nonce: u64,
        client: Arc<dyn ChainClient>,
        options: &AccountOptions,
        halt: Arc<HaltSignal>,
    ) -> Arc<Self> {
        Arc::new(Self {
            address,
            key_index: options.key_index,
            signer,
            client,
            poll_interval: options.poll_interval,
            resync_retry: options.resync_retry.clone(),
            nonce: AtomicU64::new(starting_nonce),
            gate: Arc::new(RwLock::new(())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            resync_requested: AtomicBool::new(false),
            halt,
        })
    }

    pub(crate) fn address(&self) -> Address {
        self.address
    }

    pub(crate) fn nonce(&self) -> u64 {
        self.nonce.load(Ordering::SeqCst)
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn resync_pending(&self) -> bool {
        self.resync_requested.load(Ordering::SeqCst)
    }

    pub(crate) fn halt(&self) -> &Arc<HaltSignal> {
        &self.halt
    }

    pub(crate) fn client(&self) -> &Arc<dyn ChainClient> {
        &self.client
    }

    /// Waits for a shared hold on the gate.
    async fn admit(&self) -> LoadResult<Slot> {
        if self.halt.is_halted() {
            return Err(LoadError::AccountHalted(self.address));
        }

        let halt = self.halt.token();
        let guard = tokio::select! {
            guard = self.gate.clone().read_owned() => guard,
            _ = halt.cancelled() => return Err(LoadError::AccountHalted(self.address)),
        };
        if self.halt.is_halted() {
            return Err(LoadError::AccountHalted(self.address));
        }

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Ok(Slot {
            _guard: guard,
            in_flight: self.in_flight.clone(),
        })
    }

    /// Binds, signs and sends `transaction`, then polls its result in a
    /// background task.
    ///
    /// Returns the transaction ID once the network accepted it. On `Ok`,
    /// exactly one of the callbacks fires exactly once; on `Err`, neither does.
    pub(crate) async fn submit<S, F>(
        self: &Arc<Self>,
        mut transaction: Transaction,
        on_sealed: S,
        on_failed: F,
    ) -> LoadResult<Identifier>
    where
        S: FnOnce(TransactionResult) + Send + 'static,
        F: FnOnce(LoadError) + Send + 'static,
    {
        let slot = self.admit().await?;

        // No nonce is consumed yet, so a failure here needs no resync.
        let header = match self.client.latest_block_header().await {
            Ok(header) => header,
            Err(e) => {
                warn!(sender = %self.address, error = %e, "Failed to fetch reference block");
                return Err(e);
            }
        };

        let sequence_number = self.nonce.fetch_add(1, Ordering::SeqCst);
        transaction
            .set_payer(self.address)
            .set_proposal_key(self.address, self.key_index, sequence_number)
            .add_authorizer(self.address)
            .set_reference_block_id(header.id);

        if let Err(e) =
            transaction.sign_envelope(self.address, self.key_index, self.signer.as_ref())
        {
            error!(
                sender = %self.address,
                sequence_number,
                error = %e,
                "Failed to sign transaction"
            );
            self.request_resync();
            drop(slot);
            return Err(e);
        }

        let id = match self.client.send_transaction(&transaction).await {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    sender = %self.address,
                    sequence_number,
                    error = %e,
                    "Transaction submission failed"
                );
                self.request_resync();
                drop(slot);
                return Err(e);
            }
        };

        debug!(
            sender = %self.address,
            sequence_number,
            reference_height = header.height,
            txn_id = %id,
            "Transaction submitted"
        );

        let engine = self.clone();
        tokio::spawn(async move {
            engine
                .poll(id, sequence_number, slot, on_sealed, on_failed)
                .await;
        });

        Ok(id)
    }

    async fn poll<S, F>(
        self: Arc<Self>,
        id: Identifier,
        sequence_number: u64,
        slot: Slot,
        on_sealed: S,
        on_failed: F,
    ) where
        S: FnOnce(TransactionResult) + Send + 'static,
        F: FnOnce(LoadError) + Send + 'static,
    {
        let halt = self.halt.token();
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = halt.cancelled() => {
                    drop(slot);
                    on_failed(LoadError::AccountHalted(self.address));
                    return;
                }
            }

            let outcome = match self.client.transaction_result(&id).await {
                Ok(result) => result.outcome(&id),
                Err(e) => Outcome::Failed(e),
            };

            match outcome {
                Outcome::InProgress => continue,
                Outcome::Sealed(result) => {
                    debug!(
                        sender = %self.address,
                        sequence_number,
                        txn_id = %id,
                        "Transaction sealed"
                    );
                    drop(slot);
                    on_sealed(result);
                    return;
                }
                Outcome::Failed(e) => {
                    warn!(
                        sender = %self.address,
                        sequence_number,
                        txn_id = %id,
                        error = %e,
                        "Transaction failed"
                    );
                    self.request_resync();
                    drop(slot);
                    on_failed(e);
                    return;
                }
            }
        }
    }

    /// Schedules a resync unless one is already pending. Callers holding a
    /// slot must request before releasing it so the resync drains behind them.
    fn request_resync(self: &Arc<Self>) {
        if self
            .resync_requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(sender = %self.address, "Resync already pending");
            return;
        }

        let engine = self.clone();
        tokio::spawn(async move { engine.resync().await });
    }

    async fn resync(&self) {
        let _exclusive = self.gate.write().await;
        debug!(sender = %self.address, "Gate drained, fetching sequence number");

        let executor = RetryExecutor::new(self.resync_retry.clone(), RetryScope::Resync);
        let fetched = executor
            .execute(|| self.client.account_sequence_number(self.address, self.key_index))
            .await;

        match fetched {
            Ok(sequence_number) => {
                let previous = self.nonce.swap(sequence_number, Ordering::SeqCst);
                info!(
                    sender = %self.address,
                    previous,
                    sequence_number,
                    "Resynchronized sequence number"
                );
            }
            Err(e) => {
                error!(
                    sender = %self.address,
                    error = %e,
                    "Failed to resynchronize sequence number, halting"
                );
                self.halt.halt(LoadError::ResyncFailed {
                    address: self.address,
                    message: e.to_string(),
                });
            }
        }

        self.resync_requested.store(false, Ordering::SeqCst);
    }
}
