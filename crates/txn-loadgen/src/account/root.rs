use crate::account::{Account, HaltSignal, SubmissionEngine};
use crate::client::ChainClient;
use crate::config::AccountOptions;
use crate::crypto::{AccountKey, InMemorySigner, KeyProvider, PrivateKey};
use crate::error::{LoadError, LoadResult};
use crate::factory::TransactionFactory;
use crate::retry::{RetryExecutor, RetryScope};
use crate::types::Address;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// The funded account every other account is minted from.
///
/// Accounts created by a root share its client, factory and options, and its
/// halt signal: if any of them can no longer recover its nonce, all of them
/// stop accepting submissions.
pub struct Root {
    account: Account,
    keys: Arc<dyn KeyProvider>,
    options: AccountOptions,
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root").field("account", &self.account).finish()
    }
}

impl Root {
    /// Connects to a funded account, fetching its starting sequence number.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence number cannot be fetched.
    pub async fn new(
        client: Arc<dyn ChainClient>,
        factory: Arc<dyn TransactionFactory>,
        keys: Arc<dyn KeyProvider>,
        address: Address,
        private_key: PrivateKey,
        options: AccountOptions,
    ) -> LoadResult<Self> {
        let executor = RetryExecutor::new(options.resync_retry.clone(), RetryScope::Resync);
        let sequence_number = executor
            .execute(|| client.account_sequence_number(address, options.key_index))
            .await?;

        info!(
            sender = %address,
            sequence_number,
            key_index = options.key_index,
            "Initialized root account"
        );

        let engine = SubmissionEngine::new(
            address,
            Box::new(InMemorySigner::new(private_key)),
            sequence_number,
            client,
            &options,
            HaltSignal::new(),
        );

        Ok(Self {
            account: Account::new(engine, factory),
            keys,
            options,
        })
    }

    /// The root as a plain account.
    pub fn as_account(&self) -> &Account {
        &self.account
    }

    /// The root's address.
    pub fn address(&self) -> Address {
        self.account.address()
    }

    /// Creates and funds a new account, waiting until the creation seals.
    ///
    /// # Errors
    ///
    /// Returns the submission or execution error, or
    /// [`LoadError::MissingEvent`] if the sealed transaction did not report the
    /// new address. No account is returned on any error.
    pub async fn create_user(&self) -> LoadResult<Account> {
        let private_key = self.keys.generate_private_key()?;
        let key = AccountKey::new(&private_key.public_key());
        let transaction = self
            .account
            .factory()
            .create_account(&key, self.options.initial_balance)?;

        let sealed = self.account.submit_and_wait(transaction).await?;
        let address = sealed.result.created_address(&sealed.id)?;
        debug!(
            creator = %self.address(),
            address = %address,
            txn_id = %sealed.id,
            "Account created"
        );

        let parent = self.account.engine();
        let engine = SubmissionEngine::new(
            address,
            Box::new(InMemorySigner::new(private_key)),
            0,
            parent.client().clone(),
            &self.options,
            parent.halt().clone(),
        );
        Ok(Account::new(engine, self.account.factory().clone()))
    }

    pub(crate) fn halt_token(&self) -> CancellationToken {
        self.account.engine().halt().token()
    }

    /// The reason the run halted.
    pub(crate) fn halt_error(&self) -> LoadError {
        self.account.engine().halt().take_reason(self.address())
    }
}
