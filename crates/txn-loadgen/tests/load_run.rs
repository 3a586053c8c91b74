//! End-to-end load runs against a stubbed access node.
//!
//! The stub answers every read the same way: a sealed block, a sequence
//! number for the service account, and a sealed result carrying an
//! account-created event.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use txn_loadgen::client::RestChainClient;
use txn_loadgen::config::{AccountOptions, ClientConfig, ContractAddresses, LoadConfig, Network};
use txn_loadgen::crypto::{P256KeyProvider, PrivateKey};
use txn_loadgen::factory::ScriptLibrary;
use txn_loadgen::retry::RetryConfig;
use txn_loadgen::types::{Address, Event, Identifier};
use txn_loadgen::{LoadError, LoadScheduler, Root, StopReason};
use wiremock::{
    matchers::{method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

const SERVICE_PATH: &str = "/v1/accounts/f8d6e0586b0a20c7";

fn created_address() -> Address {
    Address::from_hex("0x01cf0e2f2f715450").unwrap()
}

async fn mount_chain(server: &MockServer, starting_sequence_number: u64, with_event: bool) {
    Mock::given(method("GET"))
        .and(path("/v1/blocks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "header": {
                "id": Identifier::sha3_256(b"block").to_hex(),
                "parent_id": Identifier::sha3_256(b"parent").to_hex(),
                "height": "100"
            }
        }])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(SERVICE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "keys": [{ "index": "0", "sequence_number": starting_sequence_number.to_string() }]
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": Identifier::sha3_256(b"txn").to_hex()
        })))
        .mount(server)
        .await;

    let events = if with_event {
        let payload = Event::account_created(created_address()).payload;
        serde_json::json!([{
            "type": "flow.AccountCreated",
            "payload": base64::encode(serde_json::to_vec(&payload).unwrap())
        }])
    } else {
        serde_json::json!([])
    };
    Mock::given(method("GET"))
        .and(path_regex("^/v1/transaction_results/[0-9a-f]{64}$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "Sealed",
            "error_message": "",
            "events": events
        })))
        .mount(server)
        .await;
}

async fn connect(server: &MockServer) -> Result<Root, LoadError> {
    let config = ClientConfig::custom(Network::Emulator, &format!("{}/v1", server.uri()))?
        .without_retry();
    let contracts = ContractAddresses::for_network(Network::Emulator);
    let options = AccountOptions::default()
        .with_poll_interval(Duration::from_millis(10))
        .with_resync_retry(RetryConfig::no_retry());

    Root::new(
        Arc::new(RestChainClient::new(config)?),
        Arc::new(ScriptLibrary::new(contracts.fungible_token, contracts.flow_token)),
        Arc::new(P256KeyProvider),
        contracts.service_account,
        PrivateKey::generate(),
        options,
    )
    .await
}

fn proposal(body: &[u8]) -> (String, String) {
    let body: serde_json::Value = serde_json::from_slice(body).unwrap();
    (
        body["proposal_key"]["address"].as_str().unwrap().to_string(),
        body["proposal_key"]["sequence_number"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_run_spends_budget() {
    let server = MockServer::start().await;
    mount_chain(&server, 5, true).await;

    let root = connect(&server).await.unwrap();
    let config = LoadConfig::default()
        .with_accounts(3)
        .with_budget(6)
        .with_sealing_window(Duration::from_millis(300));
    let report = LoadScheduler::new(root, config, CancellationToken::new())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::BudgetExhausted);
    assert_eq!(report.accounts_created, 3);
    assert_eq!(report.transfers_issued, 3);
    assert_eq!(report.transactions_issued, 6);

    let requests = server.received_requests().await.unwrap();
    let from_service: Vec<String> = requests
        .iter()
        .filter(|r| r.method.to_string() == "POST")
        .map(|r| proposal(&r.body))
        .filter(|(address, _)| address == "f8d6e0586b0a20c7")
        .map(|(_, nonce)| nonce)
        .collect();
    assert_eq!(from_service, vec!["5", "6", "7"]);

    // Created accounts start from sequence number zero.
    let from_users = requests
        .iter()
        .filter(|r| r.method.to_string() == "POST")
        .map(|r| proposal(&r.body))
        .filter(|(address, _)| *address == created_address().to_hex_unprefixed())
        .collect::<Vec<_>>();
    assert!(from_users.iter().all(|(_, nonce)| nonce == "0"));

    // Nothing resynced: the service account was read exactly once.
    let reads = requests
        .iter()
        .filter(|r| r.url.path() == SERVICE_PATH)
        .count();
    assert_eq!(reads, 1);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let server = MockServer::start().await;
    mount_chain(&server, 0, true).await;

    let root = connect(&server).await.unwrap();
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let report = LoadScheduler::new(root, LoadConfig::default(), shutdown)
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(report.stop_reason, StopReason::Interrupted);
    assert_eq!(report.transfers_issued, 0);
}

#[tokio::test]
async fn test_missing_creation_event_is_fatal() {
    let server = MockServer::start().await;
    mount_chain(&server, 0, false).await;

    let root = connect(&server).await.unwrap();
    let config = LoadConfig::default().with_accounts(2);
    let result = LoadScheduler::new(root, config, CancellationToken::new())
        .unwrap()
        .run()
        .await;
    assert!(matches!(result, Err(LoadError::MissingEvent { .. })));
}

#[tokio::test]
async fn test_unreachable_root_account() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SERVICE_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "code": 404,
            "message": "account not found"
        })))
        .mount(&server)
        .await;

    let err = connect(&server).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_zero_sealing_window_rejected() {
    let server = MockServer::start().await;
    mount_chain(&server, 0, true).await;

    let root = connect(&server).await.unwrap();
    let config = LoadConfig::default().with_sealing_window(Duration::ZERO);
    assert!(matches!(
        LoadScheduler::new(root, config, CancellationToken::new()),
        Err(LoadError::Config(_))
    ));
}
