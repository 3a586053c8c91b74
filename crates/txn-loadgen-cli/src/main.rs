//! txn-loadgen - drive a continuous stream of transfers against a network.
//!
//! Mints accounts from a funded service account, then sends random transfers
//! between them at a pace that follows the network's sealing cadence until
//! the transaction budget is spent or the process is interrupted.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use txn_loadgen::client::RestChainClient;
use txn_loadgen::config::{AccountOptions, ClientConfig, ContractAddresses, LoadConfig, Network};
use txn_loadgen::crypto::{P256KeyProvider, PrivateKey};
use txn_loadgen::factory::ScriptLibrary;
use txn_loadgen::types::Address;
use txn_loadgen::{LoadReport, LoadScheduler, Root};

/// Well-known private key of the emulator's service account.
const EMULATOR_SERVICE_KEY: &str =
    "8ae3d0461cfed6d6f49bfc25fa899351c39d1bd21fdba8c87595b6c49bb4cc43";

/// Generate transaction load against a network.
#[derive(Parser, Debug)]
#[command(name = "txn-loadgen", version, about, long_about = None)]
struct Cli {
    /// Access node API URL (defaults to the network's public endpoint)
    #[arg(short, long, env = "TXN_LOADGEN_API")]
    api: Option<String>,

    /// Service account private key, hex encoded
    #[arg(short, long, env = "TXN_LOADGEN_KEY", default_value = EMULATOR_SERVICE_KEY)]
    key: String,

    /// Network to use
    #[arg(short, long, value_enum, default_value = "testnet")]
    net: NetworkArg,

    /// Service account address (overrides the network preset)
    #[arg(long)]
    service_account: Option<String>,

    /// Fungible token contract address (overrides the network preset)
    #[arg(long)]
    fungible_token: Option<String>,

    /// Flow token contract address (overrides the network preset)
    #[arg(long)]
    flow_token: Option<String>,

    /// Default token balance for new accounts
    #[arg(short, long, default_value_t = 1_000_000)]
    balance: u64,

    /// Number of accounts to create
    #[arg(long, default_value_t = 100)]
    accounts: usize,

    /// Total transactions to issue, account creations included
    #[arg(long, default_value_t = 10_000)]
    budget: u64,

    /// Expected time for a transaction to seal, in seconds
    #[arg(long, default_value_t = 15)]
    sealing_window_secs: u64,

    /// Token units sent per transfer
    #[arg(long, default_value_t = 1)]
    amount: u64,

    /// Interval between transaction result polls, in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_interval_ms: u64,

    /// HTTP request timeout, in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Log level filter, used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Supported network names.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum NetworkArg {
    Emulator,
    Testnet,
    Mainnet,
}

impl From<NetworkArg> for Network {
    fn from(arg: NetworkArg) -> Self {
        match arg {
            NetworkArg::Emulator => Network::Emulator,
            NetworkArg::Testnet => Network::Testnet,
            NetworkArg::Mainnet => Network::Mainnet,
        }
    }
}

impl Cli {
    fn client_config(&self) -> Result<ClientConfig> {
        let network = Network::from(self.net);
        let config = match &self.api {
            Some(url) => ClientConfig::custom(network, url)
                .with_context(|| format!("invalid access node URL {url}"))?,
            None => ClientConfig::for_network(network),
        };
        Ok(config.with_timeout(Duration::from_secs(self.timeout_secs)))
    }

    fn contracts(&self) -> Result<ContractAddresses> {
        let mut contracts = ContractAddresses::for_network(self.net.into());
        if let Some(address) = &self.service_account {
            contracts = contracts.with_service_account(parse_address(address)?);
        }
        if let Some(address) = &self.fungible_token {
            contracts = contracts.with_fungible_token(parse_address(address)?);
        }
        if let Some(address) = &self.flow_token {
            contracts = contracts.with_flow_token(parse_address(address)?);
        }
        Ok(contracts)
    }

    fn account_options(&self) -> AccountOptions {
        AccountOptions::default()
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_initial_balance(self.balance)
    }

    fn load_config(&self) -> LoadConfig {
        LoadConfig::default()
            .with_accounts(self.accounts)
            .with_budget(self.budget)
            .with_sealing_window(Duration::from_secs(self.sealing_window_secs))
            .with_transfer_amount(self.amount)
    }
}

fn parse_address(s: &str) -> Result<Address> {
    Address::from_hex(s).with_context(|| format!("invalid address {s}"))
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Cancels `shutdown` on the first interrupt and exits on the second.
fn watch_interrupts(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupt received, stopping (interrupt again to force exit)");
        shutdown.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Second interrupt, exiting immediately");
            std::process::exit(130);
        }
    });
}

fn print_report(report: &LoadReport) {
    println!("stop reason:         {}", report.stop_reason);
    println!("elapsed:             {:.1}s", report.elapsed.as_secs_f64());
    println!("accounts created:    {}", report.accounts_created);
    println!("transfers issued:    {}", report.transfers_issued);
    println!("transfers sealed:    {}", report.transfers_sealed);
    println!("transfers failed:    {}", report.transfers_failed);
    println!("transactions issued: {}", report.transactions_issued);
}

async fn run(cli: Cli) -> Result<()> {
    let client_config = cli.client_config()?;
    let contracts = cli.contracts()?;
    let private_key = PrivateKey::from_hex(&cli.key)
        .context("could not decode service account private key")?;

    info!(
        api = %client_config.access_url(),
        network = %client_config.network(),
        service_account = %contracts.service_account,
        "Connecting to access node"
    );
    let client =
        RestChainClient::new(client_config).context("could not build access node client")?;
    let library = ScriptLibrary::new(contracts.fungible_token, contracts.flow_token);

    let root = Root::new(
        Arc::new(client),
        Arc::new(library),
        Arc::new(P256KeyProvider),
        contracts.service_account,
        private_key,
        cli.account_options(),
    )
    .await
    .with_context(|| format!("could not get root account {}", contracts.service_account))?;

    let shutdown = CancellationToken::new();
    watch_interrupts(shutdown.clone());

    let report = LoadScheduler::new(root, cli.load_config(), shutdown)
        .context("invalid load configuration")?
        .run()
        .await
        .context("load run aborted")?;

    print_report(&report);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}
