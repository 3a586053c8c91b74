use std::sync::atomic::{AtomicU64, Ordering};

/// A ceiling on transactions issued by one run.
///
/// Increments that would exceed the ceiling are refused, so the number issued
/// never goes past the limit even under concurrent callers.
#[derive(Debug)]
pub struct Budget {
    limit: u64,
    issued: AtomicU64,
    accounts_created: AtomicU64,
}

impl Budget {
    /// Creates a budget of `limit` transactions.
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            issued: AtomicU64::new(0),
            accounts_created: AtomicU64::new(0),
        }
    }

    /// Takes one unit. Returns false once the budget is spent.
    pub fn try_issue(&self) -> bool {
        self.issued
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |issued| {
                (issued < self.limit).then_some(issued + 1)
            })
            .is_ok()
    }

    /// Takes one unit for an account creation.
    pub fn try_issue_creation(&self) -> bool {
        let issued = self.try_issue();
        if issued {
            self.accounts_created.fetch_add(1, Ordering::SeqCst);
        }
        issued
    }

    /// The ceiling.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Units taken so far.
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Units taken for account creations.
    pub fn accounts_created(&self) -> u64 {
        self.accounts_created.load(Ordering::SeqCst)
    }

    /// Units left.
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.issued())
    }

    /// Whether every unit has been taken.
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}
