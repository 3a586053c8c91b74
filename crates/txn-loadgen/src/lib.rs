//! # txn-loadgen
//!
//! Load generation against an account-based blockchain whose accounts carry
//! per-key sequence numbers.
//!
//! The crate has two halves:
//!
//! - A **submission engine** behind every [`Account`]. It hands out sequence
//!   numbers to many concurrent submissions, polls each transaction until it
//!   seals or fails, and re-reads the on-chain sequence number whenever a
//!   submission may have left a gap. Resyncs wait for in-flight submissions to
//!   drain and block new ones until they finish.
//! - An adaptive **load scheduler**. It mints accounts from a funded [`Root`]
//!   and issues random transfers between idle accounts at a rate that scales
//!   with the number of accounts, until a transaction budget is spent.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use txn_loadgen::account::Root;
//! use txn_loadgen::client::RestChainClient;
//! use txn_loadgen::config::{AccountOptions, ClientConfig, ContractAddresses, LoadConfig, Network};
//! use txn_loadgen::crypto::{P256KeyProvider, PrivateKey};
//! use txn_loadgen::factory::ScriptLibrary;
//! use txn_loadgen::scheduler::LoadScheduler;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let network = Network::Emulator;
//!     let contracts = ContractAddresses::for_network(network);
//!     let client = RestChainClient::new(ClientConfig::for_network(network))?;
//!     let library = ScriptLibrary::new(contracts.fungible_token, contracts.flow_token);
//!
//!     let root = Root::new(
//!         Arc::new(client),
//!         Arc::new(library),
//!         Arc::new(P256KeyProvider),
//!         contracts.service_account,
//!         PrivateKey::from_hex("8ae3d0461cfed6d6f49bfc25fa899351c39d1bd21fdba8c87595b6c49bb4cc43")?,
//!         AccountOptions::default(),
//!     )
//!     .await?;
//!
//!     let config = LoadConfig::default().with_accounts(10).with_budget(100);
//!     let report = LoadScheduler::new(root, config, CancellationToken::new())?
//!         .run()
//!         .await?;
//!     println!("{report:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`account`] - Accounts, the root account and the submission engine
//! - [`scheduler`] - Budgeted, adaptive transfer scheduling
//! - [`client`] - Access node client
//! - [`factory`] - Transaction templates
//! - [`crypto`] - Keys and signing
//! - [`types`] - Core network types

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod account;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod factory;
pub mod retry;
pub mod scheduler;
pub mod types;

// Re-export main entry points
pub use account::{Account, Root, SealedTransaction};
pub use config::{AccountOptions, ClientConfig, LoadConfig, Network};
pub use error::{LoadError, LoadResult};
pub use scheduler::{LoadReport, LoadScheduler, StopReason};

// Re-export commonly used types
pub use types::{Address, Identifier, Transaction};
