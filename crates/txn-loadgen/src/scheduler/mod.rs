//! Adaptive load scheduling.
//!
//! A run has two activities. The creation task mints accounts from the root
//! one at a time and hands them over a channel. The control loop owns the
//! [`AccountPool`]: on every tick it picks a random sender and receiver among
//! idle accounts and spawns a transfer, then recomputes the tick interval so
//! that each account sends about once per sealing window. Senders come back
//! over a second channel when their transfer settles.
//!
//! The run ends when the [`Budget`] is spent or the shutdown token is
//! cancelled. An account creation already submitted is waited for, so its
//! sequence number is never left dangling; transfers still outstanding are
//! not awaited.

mod budget;
mod pool;

pub use budget::Budget;
pub use pool::AccountPool;

use crate::account::{Account, Root};
use crate::config::LoadConfig;
use crate::error::{LoadError, LoadResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Every unit of the transaction budget was issued.
    BudgetExhausted,
    /// The shutdown token was cancelled from outside.
    Interrupted,
    /// Account creation finished with fewer than two accounts, so no transfer
    /// can ever be issued.
    InsufficientAccounts,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            StopReason::BudgetExhausted => "budget exhausted",
            StopReason::Interrupted => "interrupted",
            StopReason::InsufficientAccounts => "insufficient accounts",
        };
        f.write_str(reason)
    }
}

/// Summary of a finished run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadReport {
    /// Accounts minted and added to the pool.
    pub accounts_created: u64,
    /// Transfers spawned.
    pub transfers_issued: u64,
    /// Transfers that sealed before the run ended.
    pub transfers_sealed: u64,
    /// Transfers that failed before the run ended.
    pub transfers_failed: u64,
    /// Budget units taken, creations included.
    pub transactions_issued: u64,
    /// Why the run ended.
    pub stop_reason: StopReason,
    /// Wall time of the run.
    pub elapsed: Duration,
}

/// Drives account creation and transfers against a [`Root`].
///
/// # Example
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use tokio_util::sync::CancellationToken;
/// # use txn_loadgen::account::Root;
/// # use txn_loadgen::config::LoadConfig;
/// # use txn_loadgen::scheduler::LoadScheduler;
/// # async fn run(root: Root) -> txn_loadgen::error::LoadResult<()> {
/// let shutdown = CancellationToken::new();
/// let scheduler = LoadScheduler::new(root, LoadConfig::default(), shutdown.clone())?;
/// let report = scheduler.run().await?;
/// println!("{} transfers sealed", report.transfers_sealed);
/// # Ok(())
/// # }
/// ```
pub struct LoadScheduler {
    root: Arc<Root>,
    config: LoadConfig,
    budget: Arc<Budget>,
    shutdown: CancellationToken,
    rng: StdRng,
}

impl fmt::Debug for LoadScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadScheduler")
            .field("root", &self.root.address())
            .field("config", &self.config)
            .field("budget", &self.budget)
            .finish()
    }
}

impl LoadScheduler {
    /// Creates a scheduler. Cancelling `shutdown` ends the run.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Config`] if the configuration is unusable.
    pub fn new(root: Root, config: LoadConfig, shutdown: CancellationToken) -> LoadResult<Self> {
        config.validate()?;
        Ok(Self {
            root: Arc::new(root),
            budget: Arc::new(Budget::new(config.budget)),
            config,
            shutdown,
            rng: StdRng::from_entropy(),
        })
    }

    /// Uses a seeded random source for pair selection.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// The run's budget.
    pub fn budget(&self) -> Arc<Budget> {
        self.budget.clone()
    }

    /// Runs until the budget is spent or shutdown is requested.
    ///
    /// # Errors
    ///
    /// Returns the creation error if an account cannot be created, or the
    /// halt reason if any account's nonce could not be recovered.
    pub async fn run(mut self) -> LoadResult<LoadReport> {
        let started = Instant::now();
        // Budget exhaustion stops the run without cancelling the caller's token.
        let stop = self.shutdown.child_token();
        let halt = self.root.halt_token();

        let (account_tx, mut account_rx) = mpsc::unbounded_channel();
        let (return_tx, mut return_rx) = mpsc::unbounded_channel::<(Account, bool)>();

        let mut creation = tokio::spawn(create_accounts(
            self.root.clone(),
            self.config.accounts,
            self.budget.clone(),
            stop.clone(),
            account_tx,
        ));
        let mut creation_done = false;

        info!(
            accounts = self.config.accounts,
            budget = self.budget.limit(),
            sealing_window_ms = self.config.sealing_window.as_millis() as u64,
            "Starting load run"
        );

        let mut pool = AccountPool::new();
        let mut report = LoadReport {
            accounts_created: 0,
            transfers_issued: 0,
            transfers_sealed: 0,
            transfers_failed: 0,
            transactions_issued: 0,
            stop_reason: StopReason::Interrupted,
            elapsed: Duration::ZERO,
        };
        let mut deadline = Instant::now() + self.config.interval_for(0);

        let stop_reason = loop {
            tokio::select! {
                biased;

                _ = stop.cancelled() => {
                    break if self.shutdown.is_cancelled() {
                        StopReason::Interrupted
                    } else {
                        StopReason::BudgetExhausted
                    };
                }
                _ = halt.cancelled() => {
                    stop.cancel();
                    return Err(self.root.halt_error());
                }
                Some(account) = account_rx.recv() => {
                    report.accounts_created += 1;
                    pool.add(account);
                }
                Some((sender, sealed)) = return_rx.recv() => {
                    if sealed {
                        report.transfers_sealed += 1;
                    } else {
                        report.transfers_failed += 1;
                    }
                    pool.check_in(sender);
                }
                joined = &mut creation, if !creation_done => {
                    creation_done = true;
                    match joined {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            stop.cancel();
                            return Err(e);
                        }
                        Err(e) => {
                            stop.cancel();
                            return Err(LoadError::Other(anyhow::anyhow!(
                                "account creation task failed: {e}"
                            )));
                        }
                    }
                    while let Ok(account) = account_rx.try_recv() {
                        report.accounts_created += 1;
                        pool.add(account);
                    }
                    if pool.total() < 2 && !stop.is_cancelled() {
                        warn!(accounts = pool.total(), "Not enough accounts to transfer between");
                        break StopReason::InsufficientAccounts;
                    }
                }
                _ = sleep_until(deadline) => {
                    if self.budget.is_exhausted() {
                        info!(issued = self.budget.issued(), "Transaction budget exhausted");
                        stop.cancel();
                    } else if pool.available() >= 2 {
                        if self.budget.try_issue() {
                            self.spawn_transfer(&mut pool, &return_tx);
                            report.transfers_issued += 1;
                        }
                        if self.budget.is_exhausted() {
                            info!(issued = self.budget.issued(), "Transaction budget exhausted");
                            stop.cancel();
                        }
                    } else {
                        debug!(
                            available = pool.available(),
                            engaged = pool.engaged(),
                            "No idle pair for this tick"
                        );
                    }
                    let interval = self.config.interval_for(pool.total());
                    deadline = Instant::now() + interval;
                    debug!(
                        accounts = pool.total(),
                        interval_ms = interval.as_millis() as u64,
                        "Next transfer scheduled"
                    );
                }
            }
        };

        stop.cancel();
        if !creation_done {
            debug!("Waiting for the account creation in flight");
            match creation.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Account creation failed while stopping"),
                Err(e) => warn!(error = %e, "Account creation task failed while stopping"),
            }
            while account_rx.try_recv().is_ok() {
                report.accounts_created += 1;
            }
        }
        report.transactions_issued = self.budget.issued();
        report.stop_reason = stop_reason;
        report.elapsed = started.elapsed();

        info!(
            reason = %stop_reason,
            accounts_created = report.accounts_created,
            transfers_issued = report.transfers_issued,
            transfers_sealed = report.transfers_sealed,
            transfers_failed = report.transfers_failed,
            "Load run finished"
        );
        Ok(report)
    }

    fn spawn_transfer(
        &mut self,
        pool: &mut AccountPool,
        returns: &mpsc::UnboundedSender<(Account, bool)>,
    ) {
        let Some((sender, receiver)) = pool.checkout_pair(&mut self.rng) else {
            return;
        };
        let amount = self.config.transfer_amount;
        let returns = returns.clone();
        tokio::spawn(async move {
            let sealed = sender.send_tokens(receiver, amount).await.is_ok();
            // The run may have ended; the sender is simply dropped then.
            let _ = returns.send((sender, sealed));
        });
    }
}

async fn create_accounts(
    root: Arc<Root>,
    count: usize,
    budget: Arc<Budget>,
    stop: CancellationToken,
    accounts: mpsc::UnboundedSender<Account>,
) -> LoadResult<()> {
    for created in 0..count {
        if stop.is_cancelled() {
            debug!(created, "Account creation stopped");
            return Ok(());
        }
        if !budget.try_issue_creation() {
            info!(created, "Transaction budget exhausted during account creation");
            stop.cancel();
            return Ok(());
        }

        let account = root.create_user().await?;
        info!(
            address = %account.address(),
            created = created + 1,
            total = count,
            "Created account"
        );
        if accounts.send(account).is_err() {
            return Ok(());
        }
    }

    info!(count, "Account creation finished");
    Ok(())
}
