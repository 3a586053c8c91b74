//! Access node REST API client.

use crate::client::ChainClient;
use crate::config::ClientConfig;
use crate::error::{LoadError, LoadResult};
use crate::retry::{RetryConfig, RetryExecutor, RetryScope};
use crate::types::{
    Address, BlockHeader, Event, Identifier, Transaction, TransactionResult, TransactionStatus,
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::debug;
use url::Url;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Client for an access node's REST API.
///
/// Reads are retried with exponential backoff per the configured
/// [`RetryConfig`]. Submissions are sent exactly once.
///
/// # Example
///
/// ```rust,no_run
/// use txn_loadgen::client::{ChainClient, RestChainClient};
/// use txn_loadgen::config::ClientConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = RestChainClient::new(ClientConfig::emulator())?;
///     let header = client.latest_block_header().await?;
///     println!("Sealed height: {}", header.height);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RestChainClient {
    config: ClientConfig,
    client: Client,
    retry_config: Arc<RetryConfig>,
}

impl RestChainClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: ClientConfig) -> LoadResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .tcp_nodelay(true)
            .build()
            .map_err(LoadError::Http)?;
        let retry_config = Arc::new(config.retry_config().clone());

        Ok(Self {
            config,
            client,
            retry_config,
        })
    }

    /// Returns the base URL of the access node.
    pub fn base_url(&self) -> &Url {
        self.config.access_url()
    }

    fn build_url(&self, path: &str) -> Url {
        let mut url = self.config.access_url().clone();
        if !path.is_empty() {
            if !url.path().ends_with('/') {
                url.set_path(&format!("{}/", url.path()));
            }
            url.set_path(&format!("{}{}", url.path(), path));
        }
        url
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url) -> LoadResult<T> {
        let client = self.client.clone();
        let executor = RetryExecutor::new((*self.retry_config).clone(), RetryScope::Read);
        executor
            .execute(|| {
                let client = client.clone();
                let url = url.clone();
                async move {
                    let response = client
                        .get(url)
                        .header(ACCEPT, JSON_CONTENT_TYPE)
                        .send()
                        .await?;
                    Self::handle_response(response).await
                }
            })
            .await
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> LoadResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message = body
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Err(LoadError::api(status.as_u16(), message))
    }
}

#[async_trait]
impl ChainClient for RestChainClient {
    async fn latest_block_header(&self) -> LoadResult<BlockHeader> {
        let mut url = self.build_url("blocks");
        url.query_pairs_mut().append_pair("height", "sealed");

        let blocks: Vec<BlockResponse> = self.get_json(url).await?;
        let block = blocks
            .into_iter()
            .next()
            .ok_or_else(|| LoadError::api(404, "no sealed block returned"))?;
        Ok(BlockHeader {
            id: block.header.id,
            parent_id: block.header.parent_id,
            height: block.header.height,
        })
    }

    async fn account_sequence_number(&self, address: Address, key_index: u32) -> LoadResult<u64> {
        let mut url = self.build_url(&format!("accounts/{}", address.to_hex_unprefixed()));
        url.query_pairs_mut().append_pair("expand", "keys");

        let account: AccountResponse = self.get_json(url).await?;
        let key = account
            .keys
            .iter()
            .find(|k| k.index == u64::from(key_index))
            .ok_or_else(|| LoadError::api(404, format!("key {key_index} not found on {address}")))?;

        debug!(sender = %address, sequence_number = key.sequence_number, "Retrieved sequence number");
        Ok(key.sequence_number)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> LoadResult<Identifier> {
        let url = self.build_url("transactions");
        let body = TransactionRequest::from(transaction);

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(ACCEPT, JSON_CONTENT_TYPE)
            .json(&body)
            .send()
            .await?;
        let submitted: SubmitResponse = Self::handle_response(response).await?;
        Ok(submitted.id)
    }

    async fn transaction_result(&self, id: &Identifier) -> LoadResult<TransactionResult> {
        let url = self.build_url(&format!("transaction_results/{}", id.to_hex()));

        let result: TransactionResultResponse = match self.get_json(url).await {
            Ok(result) => result,
            Err(e) if e.is_not_found() => {
                return Ok(TransactionResult::with_status(TransactionStatus::Unknown))
            }
            Err(e) => return Err(e),
        };

        let status: TransactionStatus = result.status.parse()?;
        let events = result
            .events
            .into_iter()
            .map(|event| -> LoadResult<Event> {
                let payload = base64::decode(&event.payload)?;
                Ok(Event {
                    event_type: event.event_type,
                    payload: serde_json::from_slice(&payload)?,
                })
            })
            .collect::<LoadResult<Vec<Event>>>()?;

        Ok(TransactionResult {
            status,
            error_message: result.error_message.filter(|m| !m.is_empty()),
            events,
        })
    }
}

/// The API encodes 64-bit integers as strings; accept both forms.
fn u64_from_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Str(String),
        Num(u64),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Str(s) => s.parse().map_err(serde::de::Error::custom),
        Repr::Num(n) => Ok(n),
    }
}

#[derive(Deserialize)]
struct BlockResponse {
    header: BlockHeaderResponse,
}

#[derive(Deserialize)]
struct BlockHeaderResponse {
    id: Identifier,
    parent_id: Identifier,
    #[serde(deserialize_with = "u64_from_string")]
    height: u64,
}

#[derive(Deserialize)]
struct AccountResponse {
    #[serde(default)]
    keys: Vec<AccountKeyResponse>,
}

#[derive(Deserialize)]
struct AccountKeyResponse {
    #[serde(deserialize_with = "u64_from_string")]
    index: u64,
    #[serde(deserialize_with = "u64_from_string")]
    sequence_number: u64,
}

#[derive(Deserialize)]
struct SubmitResponse {
    id: Identifier,
}

#[derive(Deserialize)]
struct TransactionResultResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    events: Vec<EventResponse>,
}

#[derive(Deserialize)]
struct EventResponse {
    #[serde(rename = "type")]
    event_type: String,
    payload: String,
}

#[derive(Serialize)]
struct TransactionRequest {
    script: String,
    arguments: Vec<String>,
    reference_block_id: String,
    gas_limit: String,
    payer: String,
    proposal_key: ProposalKeyRequest,
    authorizers: Vec<String>,
    payload_signatures: Vec<SignatureRequest>,
    envelope_signatures: Vec<SignatureRequest>,
}

#[derive(Serialize)]
struct ProposalKeyRequest {
    address: String,
    key_index: String,
    sequence_number: String,
}

#[derive(Serialize)]
struct SignatureRequest {
    address: String,
    key_index: String,
    signature: String,
}

impl From<&Transaction> for TransactionRequest {
    fn from(txn: &Transaction) -> Self {
        Self {
            script: base64::encode(&txn.script),
            arguments: txn.arguments.iter().map(base64::encode).collect(),
            reference_block_id: txn.reference_block_id.to_hex(),
            gas_limit: txn.gas_limit.to_string(),
            payer: txn.payer.to_hex_unprefixed(),
            proposal_key: ProposalKeyRequest {
                address: txn.proposal_key.address.to_hex_unprefixed(),
                key_index: txn.proposal_key.key_index.to_string(),
                sequence_number: txn.proposal_key.sequence_number.to_string(),
            },
            authorizers: txn
                .authorizers
                .iter()
                .map(Address::to_hex_unprefixed)
                .collect(),
            payload_signatures: Vec::new(),
            envelope_signatures: txn
                .envelope_signatures
                .iter()
                .map(|s| SignatureRequest {
                    address: s.address.to_hex_unprefixed(),
                    key_index: s.key_index.to_string(),
                    signature: base64::encode(s.signature.to_bytes()),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Network;
    use crate::crypto::{InMemorySigner, PrivateKey, Signature, Signer, SIGNATURE_LENGTH};
    use std::time::Duration;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn block_id(seed: &[u8]) -> String {
        Identifier::sha3_256(seed).to_hex()
    }

    fn create_mock_client(server: &MockServer) -> RestChainClient {
        let url = format!("{}/v1", server.uri());
        let config = ClientConfig::custom(Network::Emulator, &url)
            .unwrap()
            .without_retry();
        RestChainClient::new(config).unwrap()
    }

    #[test]
    fn test_build_url() {
        let client = RestChainClient::new(ClientConfig::testnet()).unwrap();
        let url = client.build_url("accounts/01");
        assert!(url.as_str().ends_with("/v1/accounts/01"));
    }

    #[tokio::test]
    async fn test_latest_block_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/blocks"))
            .and(query_param("height", "sealed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "header": {
                    "id": block_id(b"block"),
                    "parent_id": block_id(b"parent"),
                    "height": "1234",
                    "timestamp": "2021-01-01T00:00:00Z"
                }
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let header = create_mock_client(&server)
            .latest_block_header()
            .await
            .unwrap();
        assert_eq!(header.id, Identifier::sha3_256(b"block"));
        assert_eq!(header.parent_id, Identifier::sha3_256(b"parent"));
        assert_eq!(header.height, 1234);
    }

    #[tokio::test]
    async fn test_account_sequence_number_selects_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/accounts/f8d6e0586b0a20c7"))
            .and(query_param("expand", "keys"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "address": "f8d6e0586b0a20c7",
                "balance": "100000",
                "keys": [
                    { "index": "0", "sequence_number": "42", "weight": "1000", "revoked": false },
                    { "index": "1", "sequence_number": "7", "weight": "1000", "revoked": false }
                ]
            })))
            .mount(&server)
            .await;

        let client = create_mock_client(&server);
        let address = Network::Emulator.service_account();
        assert_eq!(client.account_sequence_number(address, 0).await.unwrap(), 42);
        assert_eq!(client.account_sequence_number(address, 1).await.unwrap(), 7);
        assert!(client.account_sequence_number(address, 2).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_send_transaction_body() {
        let server = MockServer::start().await;
        let txn_id = block_id(b"txn");
        Mock::given(method("POST"))
            .and(path("/v1/transactions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": txn_id })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let address = Address::from_hex("0x01cf0e2f2f715450").unwrap();
        let mut txn = Transaction::new()
            .with_script("transaction {}")
            .with_argument(b"{}".to_vec());
        txn.set_payer(address)
            .set_proposal_key(address, 0, 9)
            .add_authorizer(address)
            .set_reference_block_id(Identifier::sha3_256(b"ref"));
        let signer = InMemorySigner::new(PrivateKey::generate());
        txn.sign_envelope(address, 0, &signer).unwrap();

        let id = create_mock_client(&server)
            .send_transaction(&txn)
            .await
            .unwrap();
        assert_eq!(id, Identifier::sha3_256(b"txn"));

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["script"], base64::encode("transaction {}"));
        assert_eq!(body["gas_limit"], "9999");
        assert_eq!(body["payer"], "01cf0e2f2f715450");
        assert_eq!(body["proposal_key"]["sequence_number"], "9");
        assert_eq!(body["authorizers"][0], "01cf0e2f2f715450");
        assert_eq!(body["envelope_signatures"].as_array().unwrap().len(), 1);
        assert_eq!(body["reference_block_id"], Identifier::sha3_256(b"ref").to_hex());

        // r || s over the tagged envelope, checkable with the account's key
        let signature = body["envelope_signatures"][0]["signature"].as_str().unwrap();
        let signature = base64::decode(signature).unwrap();
        assert_eq!(signature.len(), SIGNATURE_LENGTH);
        let signature = Signature::from_bytes(&signature).unwrap();
        assert!(signer
            .public_key()
            .verify(&txn.envelope_message(), &signature)
            .is_ok());
    }

    #[tokio::test]
    async fn test_send_transaction_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/transactions"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "code": 503,
                "message": "service unavailable"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ClientConfig::custom(Network::Emulator, &format!("{}/v1", server.uri()))
            .unwrap()
            .with_retry(RetryConfig::new(3, Duration::from_millis(1)).without_jitter());
        let client = RestChainClient::new(config).unwrap();

        let err = client
            .send_transaction(&Transaction::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Api { status_code: 503, ref message } if message == "service unavailable"));
    }

    #[tokio::test]
    async fn test_transaction_result_decodes_events() {
        let server = MockServer::start().await;
        let id = Identifier::sha3_256(b"create");
        let created = Address::from_hex("0x01cf0e2f2f715450").unwrap();
        let payload = Event::account_created(created).payload;

        Mock::given(method("GET"))
            .and(path(format!("/v1/transaction_results/{}", id.to_hex())))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "block_id": block_id(b"block"),
                "status": "Sealed",
                "status_code": 0,
                "error_message": "",
                "computation_used": "10",
                "events": [{
                    "type": "flow.AccountCreated",
                    "transaction_id": id.to_hex(),
                    "transaction_index": "0",
                    "event_index": "0",
                    "payload": base64::encode(serde_json::to_vec(&payload).unwrap())
                }]
            })))
            .mount(&server)
            .await;

        let result = create_mock_client(&server)
            .transaction_result(&id)
            .await
            .unwrap();
        assert_eq!(result.status, TransactionStatus::Sealed);
        assert_eq!(result.error_message, None);
        assert_eq!(result.created_address(&id).unwrap(), created);
    }

    #[tokio::test]
    async fn test_transaction_result_not_found_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "code": 404,
                "message": "transaction not found"
            })))
            .mount(&server)
            .await;

        let result = create_mock_client(&server)
            .transaction_result(&Identifier::sha3_256(b"missing"))
            .await
            .unwrap();
        assert_eq!(result.status, TransactionStatus::Unknown);
    }

    #[tokio::test]
    async fn test_reads_retry_transient_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/accounts/f8d6e0586b0a20c7"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/accounts/f8d6e0586b0a20c7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "keys": [{ "index": "0", "sequence_number": "3" }]
            })))
            .mount(&server)
            .await;

        let config = ClientConfig::custom(Network::Emulator, &format!("{}/v1", server.uri()))
            .unwrap()
            .with_retry(RetryConfig::new(3, Duration::from_millis(1)).without_jitter());
        let client = RestChainClient::new(config).unwrap();

        let sequence_number = client
            .account_sequence_number(Network::Emulator.service_account(), 0)
            .await
            .unwrap();
        assert_eq!(sequence_number, 3);
    }

    #[tokio::test]
    async fn test_api_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/blocks"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 400,
                "message": "invalid height"
            })))
            .mount(&server)
            .await;

        let err = create_mock_client(&server)
            .latest_block_header()
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "API error (400): invalid height");
    }
}
