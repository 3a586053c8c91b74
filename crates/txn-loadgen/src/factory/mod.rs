//! Transaction construction.
//!
//! The engine never looks inside a transaction's script; it only needs a
//! [`TransactionFactory`] that hands back unsigned transactions for the two
//! operations the load generator performs.

mod arguments;
mod scripts;

pub use arguments::{CadenceValue, UFix64};
pub use scripts::ScriptLibrary;

use crate::crypto::AccountKey;
use crate::error::LoadResult;
use crate::types::{Address, Transaction};

/// Produces unsigned transactions. Stateless after construction.
pub trait TransactionFactory: Send + Sync {
    /// A transaction creating an account controlled by `key` and funding it
    /// with `initial_balance` whole tokens.
    fn create_account(&self, key: &AccountKey, initial_balance: u64) -> LoadResult<Transaction>;

    /// A transaction moving `amount` token units from the signer to `to`.
    fn transfer(&self, to: Address, amount: u64) -> LoadResult<Transaction>;
}
