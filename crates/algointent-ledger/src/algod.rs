//! HTTP client for an algod-compatible node.

use std::time::Duration;

use algointent_core::{Address, IntentError, Network, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{AssetMetadata, LedgerClient, NodeStatus, PendingTransaction, SuggestedParams};

const TOKEN_HEADER: &str = "X-Algo-API-Token";
const DUPLICATE_MARKER: &str = "already in ledger";

/// Connection settings for an algod node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgodConfig {
    pub url: String,
    pub token: String,
    pub network: Network,
    pub request_timeout_ms: u64,
}

impl Default for AlgodConfig {
    fn default() -> Self {
        Self {
            url: "https://testnet-api.algonode.cloud".to_string(),
            token: String::new(),
            network: Network::TestNet,
            request_timeout_ms: 10_000,
        }
    }
}

/// Client for the algod v2 REST API.
#[derive(Clone)]
pub struct AlgodClient {
    base_url: String,
    token: String,
    network: Network,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ParamsResponse {
    fee: u64,
    min_fee: u64,
    last_round: u64,
    genesis_id: String,
    genesis_hash: String,
}

#[derive(Debug, Deserialize)]
struct AssetResponse {
    index: u64,
    params: AssetParamsResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AssetParamsResponse {
    creator: String,
    #[serde(default)]
    decimals: u32,
    total: u64,
    #[serde(default)]
    unit_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AccountAssetResponse {
    asset_holding: HoldingResponse,
}

#[derive(Debug, Deserialize)]
struct HoldingResponse {
    amount: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PendingResponse {
    #[serde(default)]
    confirmed_round: Option<u64>,
    #[serde(default)]
    pool_error: String,
    #[serde(default)]
    asset_index: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct StatusResponse {
    last_round: u64,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(rename = "txId")]
    tx_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

impl AlgodClient {
    pub fn new(config: &AlgodConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| IntentError::Config(e.to_string()))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            network: config.network,
            http_client,
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, resource: &str, id: &str) -> Result<T> {
        debug!("GET {}", path);
        let response = self
            .http_client
            .get(self.url(path))
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(IntentError::NotFound {
                resource_type: resource.to_string(),
                id: id.to_string(),
            });
        }
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(IntentError::Network {
                message: format!("{} ({})", message, status),
            });
        }

        response.json::<T>().await.map_err(network_error)
    }
}

fn network_error(err: reqwest::Error) -> IntentError {
    IntentError::Network {
        message: err.to_string(),
    }
}

/// The node's own message when it sent one, the raw body otherwise.
async fn error_message(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) => parsed.message,
        Err(_) => body,
    }
}

/// Classify a submission rejection by the node's message.
pub(crate) fn classify_rejection(message: String) -> IntentError {
    if message.contains(DUPLICATE_MARKER) {
        IntentError::AlreadySubmitted { message }
    } else {
        IntentError::SubmissionRejected { message }
    }
}

#[async_trait]
impl LedgerClient for AlgodClient {
    async fn suggested_params(&self) -> Result<SuggestedParams> {
        let params: ParamsResponse = self
            .get_json("/v2/transactions/params", "params", "current")
            .await?;
        Ok(SuggestedParams {
            fee_per_byte: params.fee,
            min_fee: params.min_fee,
            last_round: params.last_round,
            genesis_id: params.genesis_id,
            genesis_hash: params.genesis_hash,
        })
    }

    async fn asset_metadata(&self, asset_id: u64) -> Result<AssetMetadata> {
        let id = asset_id.to_string();
        let asset: AssetResponse = self
            .get_json(&format!("/v2/assets/{}", asset_id), "asset", &id)
            .await?;
        Ok(AssetMetadata {
            id: asset.index,
            decimals: asset.params.decimals,
            total: asset.params.total,
            creator: asset.params.creator,
            unit_name: asset.params.unit_name,
            name: asset.params.name,
        })
    }

    async fn asset_holding(&self, account: &Address, asset_id: u64) -> Result<Option<u64>> {
        let path = format!("/v2/accounts/{}/assets/{}", account, asset_id);
        match self
            .get_json::<AccountAssetResponse>(&path, "asset holding", &asset_id.to_string())
            .await
        {
            Ok(response) => Ok(Some(response.asset_holding.amount)),
            Err(IntentError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn submit_group(&self, signed: &[Vec<u8>]) -> Result<String> {
        let body: Vec<u8> = signed.concat();
        debug!("POST /v2/transactions ({} transactions, {} bytes)", signed.len(), body.len());

        let response = self
            .http_client
            .post(self.url("/v2/transactions"))
            .header(TOKEN_HEADER, &self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/x-binary")
            .body(body)
            .send()
            .await
            .map_err(network_error)?;

        if !response.status().is_success() {
            let message = error_message(response).await;
            warn!("Node rejected submission: {}", message);
            return Err(classify_rejection(message));
        }

        let submitted: SubmitResponse = response.json().await.map_err(network_error)?;
        Ok(submitted.tx_id)
    }

    async fn pending_transaction(&self, txid: &str) -> Result<PendingTransaction> {
        let pending: PendingResponse = self
            .get_json(&format!("/v2/transactions/pending/{}", txid), "transaction", txid)
            .await?;
        Ok(PendingTransaction {
            confirmed_round: pending.confirmed_round.filter(|round| *round > 0),
            pool_error: Some(pending.pool_error).filter(|e| !e.is_empty()),
            asset_index: pending.asset_index,
        })
    }

    async fn status(&self) -> Result<NodeStatus> {
        let status: StatusResponse = self.get_json("/v2/status", "status", "node").await?;
        Ok(NodeStatus {
            last_round: status.last_round,
        })
    }

    async fn wait_for_round(&self, round: u64) -> Result<NodeStatus> {
        let status: StatusResponse = self
            .get_json(
                &format!("/v2/status/wait-for-block-after/{}", round),
                "status",
                &round.to_string(),
            )
            .await?;
        Ok(NodeStatus {
            last_round: status.last_round,
        })
    }
}
