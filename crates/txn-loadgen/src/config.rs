//! Network and load configuration.
//!
//! [`ClientConfig`] describes how to reach an access node, [`ContractAddresses`]
//! which accounts the scripts talk to, [`AccountOptions`] how each account's
//! submission engine behaves, and [`LoadConfig`] how hard the scheduler pushes.

use crate::error::{LoadError, LoadResult};
use crate::factory::UFix64;
use crate::retry::RetryConfig;
use crate::types::Address;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Known networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    /// Local emulator
    Emulator,
    /// Public testnet
    Testnet,
    /// Mainnet
    Mainnet,
}

impl Network {
    /// Returns the network name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Emulator => "emulator",
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }

    /// Address of the funded service account.
    pub fn service_account(&self) -> Address {
        match self {
            Network::Emulator => Address::new([0xf8, 0xd6, 0xe0, 0x58, 0x6b, 0x0a, 0x20, 0xc7]),
            Network::Testnet => Address::new([0x8c, 0x53, 0x03, 0xea, 0xa2, 0x62, 0x02, 0xd6]),
            Network::Mainnet => Address::new([0xe4, 0x67, 0xb9, 0xdd, 0x11, 0xfa, 0x00, 0xdf]),
        }
    }

    /// Address of the fungible-token interface contract.
    pub fn fungible_token(&self) -> Address {
        match self {
            Network::Emulator => Address::new([0xee, 0x82, 0x85, 0x6b, 0xf2, 0x0e, 0x2a, 0xa6]),
            Network::Testnet => Address::new([0x9a, 0x07, 0x66, 0xd9, 0x3b, 0x66, 0x08, 0xb7]),
            Network::Mainnet => Address::new([0xf2, 0x33, 0xdc, 0xee, 0x88, 0xfe, 0x0a, 0xbe]),
        }
    }

    /// Address of the native token contract.
    pub fn flow_token(&self) -> Address {
        match self {
            Network::Emulator => Address::new([0x0a, 0xe5, 0x3c, 0xb6, 0xe3, 0xf4, 0x2a, 0x79]),
            Network::Testnet => Address::new([0x7e, 0x60, 0xdf, 0x04, 0x2a, 0x9c, 0x08, 0x68]),
            Network::Mainnet => Address::new([0x16, 0x54, 0x65, 0x33, 0x99, 0x04, 0x0a, 0x61]),
        }
    }

    /// Default access node REST endpoint.
    pub fn access_url(&self) -> Url {
        let url = match self {
            Network::Emulator => "http://127.0.0.1:8888/v1",
            Network::Testnet => "https://rest-testnet.onflow.org/v1",
            Network::Mainnet => "https://rest-mainnet.onflow.org/v1",
        };
        Url::parse(url).expect("valid preset URL")
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.to_ascii_lowercase();
        match name.strip_prefix("flow-").unwrap_or(&name) {
            "emulator" | "local" => Ok(Network::Emulator),
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(LoadError::Config(format!("unknown network: {other}"))),
        }
    }
}

/// Configuration for the access node client.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use txn_loadgen::config::ClientConfig;
/// use txn_loadgen::retry::RetryConfig;
///
/// let config = ClientConfig::testnet()
///     .with_timeout(Duration::from_secs(10))
///     .with_retry(RetryConfig::emulator());
/// assert_eq!(config.timeout(), Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub(crate) network: Network,
    pub(crate) access_url: Url,
    pub(crate) timeout: Duration,
    pub(crate) retry_config: RetryConfig,
}

impl ClientConfig {
    /// Configuration for a local emulator.
    pub fn emulator() -> Self {
        Self {
            network: Network::Emulator,
            access_url: Network::Emulator.access_url(),
            timeout: Duration::from_secs(10),
            retry_config: RetryConfig::emulator(),
        }
    }

    /// Configuration for the public testnet.
    pub fn testnet() -> Self {
        Self {
            network: Network::Testnet,
            access_url: Network::Testnet.access_url(),
            timeout: Duration::from_secs(30),
            retry_config: RetryConfig::default(),
        }
    }

    /// Configuration for mainnet.
    pub fn mainnet() -> Self {
        Self {
            network: Network::Mainnet,
            access_url: Network::Mainnet.access_url(),
            timeout: Duration::from_secs(30),
            retry_config: RetryConfig::public_network(),
        }
    }

    /// Preset configuration for the given network.
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Emulator => Self::emulator(),
            Network::Testnet => Self::testnet(),
            Network::Mainnet => Self::mainnet(),
        }
    }

    /// Preset for `network` with a custom access URL. The URL must include the
    /// API version path (for example `http://localhost:8888/v1`).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn custom(network: Network, access_url: &str) -> LoadResult<Self> {
        Ok(Self {
            access_url: Url::parse(access_url)?,
            ..Self::for_network(network)
        })
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry configuration for reads.
    pub fn with_retry(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Disables retries.
    pub fn without_retry(mut self) -> Self {
        self.retry_config = RetryConfig::no_retry();
        self
    }

    /// Returns the network.
    pub fn network(&self) -> Network {
        self.network
    }

    /// Returns the access node URL.
    pub fn access_url(&self) -> &Url {
        &self.access_url
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the retry configuration.
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }
}

/// Well-known accounts the load generator uses, defaulting to a network's
/// presets and overridable one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    /// Funded account that mints every other account.
    pub service_account: Address,
    /// Fungible-token interface contract.
    pub fungible_token: Address,
    /// Native token contract.
    pub flow_token: Address,
}

impl ContractAddresses {
    /// Presets for the given network.
    pub fn for_network(network: Network) -> Self {
        Self {
            service_account: network.service_account(),
            fungible_token: network.fungible_token(),
            flow_token: network.flow_token(),
        }
    }

    /// Overrides the service account.
    pub fn with_service_account(mut self, address: Address) -> Self {
        self.service_account = address;
        self
    }

    /// Overrides the fungible-token contract.
    pub fn with_fungible_token(mut self, address: Address) -> Self {
        self.fungible_token = address;
        self
    }

    /// Overrides the native token contract.
    pub fn with_flow_token(mut self, address: Address) -> Self {
        self.flow_token = address;
        self
    }
}

/// Per-account submission behavior, shared by a root and every account it
/// mints.
#[derive(Debug, Clone)]
pub struct AccountOptions {
    /// Key index used as the proposal key and envelope signer.
    pub key_index: u32,
    /// Delay between result polls of an in-flight transaction.
    pub poll_interval: Duration,
    /// Whole tokens funded into each minted account.
    pub initial_balance: u64,
    /// Retry policy for the sequence-number fetch during a resync.
    pub resync_retry: RetryConfig,
}

impl Default for AccountOptions {
    fn default() -> Self {
        Self {
            key_index: 0,
            poll_interval: Duration::from_millis(100),
            initial_balance: 1_000_000,
            resync_retry: RetryConfig::default(),
        }
    }
}

impl AccountOptions {
    /// Sets the key index.
    pub fn with_key_index(mut self, key_index: u32) -> Self {
        self.key_index = key_index;
        self
    }

    /// Sets the result poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the balance funded into minted accounts.
    pub fn with_initial_balance(mut self, initial_balance: u64) -> Self {
        self.initial_balance = initial_balance;
        self
    }

    /// Sets the resync retry policy.
    pub fn with_resync_retry(mut self, resync_retry: RetryConfig) -> Self {
        self.resync_retry = resync_retry;
        self
    }
}

/// Scheduler configuration.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use txn_loadgen::config::LoadConfig;
///
/// let config = LoadConfig::default().with_accounts(10).with_budget(500);
/// assert_eq!(config.interval_for(10), Duration::from_millis(1500));
/// ```
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Number of accounts to create.
    pub accounts: usize,
    /// Ceiling on transactions issued, account creations included.
    pub budget: u64,
    /// Reference block-sealing window the transfer rate is tuned against.
    pub sealing_window: Duration,
    /// Token units moved by each transfer.
    pub transfer_amount: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            accounts: 100,
            budget: 10_000,
            sealing_window: Duration::from_secs(15),
            transfer_amount: 1,
        }
    }
}

impl LoadConfig {
    /// Sets the number of accounts to create.
    pub fn with_accounts(mut self, accounts: usize) -> Self {
        self.accounts = accounts;
        self
    }

    /// Sets the transaction budget.
    pub fn with_budget(mut self, budget: u64) -> Self {
        self.budget = budget;
        self
    }

    /// Sets the sealing window.
    pub fn with_sealing_window(mut self, sealing_window: Duration) -> Self {
        self.sealing_window = sealing_window;
        self
    }

    /// Sets the per-transfer amount.
    pub fn with_transfer_amount(mut self, transfer_amount: u64) -> Self {
        self.transfer_amount = transfer_amount;
        self
    }

    /// Checks the configuration for values the scheduler cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Config`] for a zero sealing window or a transfer
    /// amount of a whole token or more.
    pub fn validate(&self) -> LoadResult<()> {
        if self.sealing_window.is_zero() {
            return Err(LoadError::Config(
                "sealing window must be greater than zero".to_string(),
            ));
        }
        UFix64::from_parts(0, self.transfer_amount)?;
        Ok(())
    }

    /// Transfer interval for a population of `account_count` accounts: one
    /// transfer per account per sealing window.
    pub fn interval_for(&self, account_count: usize) -> Duration {
        let divisor = u32::try_from(account_count.max(1)).unwrap_or(u32::MAX);
        self.sealing_window / divisor
    }
}
