use crate::account::Account;
use crate::types::Address;
use rand::seq::index;
use rand::Rng;

/// Accounts known to the scheduler, split into those idle and those with a
/// transfer outstanding.
///
/// `available() + engaged() == total()` holds across every operation.
#[derive(Debug, Default)]
pub struct AccountPool {
    available: Vec<Account>,
    engaged: usize,
}

impl AccountPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a newly created account as available.
    pub fn add(&mut self, account: Account) {
        self.available.push(account);
    }

    /// Picks two distinct available accounts uniformly at random. The sender
    /// leaves the pool until checked back in; the receiver stays available.
    pub fn checkout_pair<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<(Account, Address)> {
        if self.available.len() < 2 {
            return None;
        }

        let picked = index::sample(rng, self.available.len(), 2);
        let (sender, receiver) = (picked.index(0), picked.index(1));
        let receiver = self.available[receiver].address();
        let sender = self.available.swap_remove(sender);
        self.engaged += 1;
        Some((sender, receiver))
    }

    /// Returns a sender to the pool.
    pub fn check_in(&mut self, account: Account) {
        self.engaged = self.engaged.saturating_sub(1);
        self.available.push(account);
    }

    /// Accounts idle.
    pub fn available(&self) -> usize {
        self.available.len()
    }

    /// Accounts with a transfer outstanding.
    pub fn engaged(&self) -> usize {
        self.engaged
    }

    /// All known accounts.
    pub fn total(&self) -> usize {
        self.available.len() + self.engaged
    }
}
