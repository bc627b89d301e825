//! DEX-quote collaborator.
//!
//! A quoter prices an asset pair and returns a ready-to-sign descriptor
//! sequence. The engine never recomputes the price.

use std::time::Duration;

use algointent_core::encoding::decode_base64;
use algointent_core::{Address, Authorization, IntentError, Result, TransactionDescriptor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the caller wants to swap, in base units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub sender: Address,
    pub from_asset_id: u64,
    pub to_asset_id: u64,
    pub amount: u64,
    pub slippage: f64,
}

/// A priced swap with the transactions that execute it.
#[derive(Debug, Clone)]
pub struct SwapQuote {
    pub provider: String,
    pub expected_out: u64,
    pub price_impact: f64,
    /// Descriptors in submission order. Some may be pre-signed.
    pub transactions: Vec<TransactionDescriptor>,
    /// The collaborator's quote as received.
    pub raw: serde_json::Value,
}

#[async_trait]
pub trait DexQuoter: Send + Sync {
    async fn quote(&self, request: &SwapRequest) -> Result<SwapQuote>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DexConfig {
    pub url: String,
    pub provider: String,
    pub request_timeout_ms: u64,
}

impl Default for DexConfig {
    fn default() -> Self {
        Self {
            url: "https://testnet.tinyman.org/api/v1".to_string(),
            provider: "tinyman".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    expected_out: u64,
    #[serde(default)]
    price_impact: f64,
}

#[derive(Debug, Serialize)]
struct TransactionsRequest<'a> {
    sender: String,
    quote: &'a serde_json::Value,
}

/// One generated transaction: canonical bytes plus optional signed bytes.
#[derive(Debug, Deserialize)]
struct GeneratedTransaction {
    txn: String,
    #[serde(default)]
    signed: Option<String>,
}

/// Quoter backed by a DEX aggregator's REST API.
pub struct HttpDexQuoter {
    base_url: String,
    provider: String,
    http_client: reqwest::Client,
}

impl HttpDexQuoter {
    pub fn new(config: &DexConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| IntentError::Config(e.to_string()))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            provider: config.provider.clone(),
            http_client,
        })
    }
}

fn quote_error(err: reqwest::Error) -> IntentError {
    IntentError::QuoteFailed(err.to_string())
}

/// Turn the collaborator's transaction list into descriptors.
fn decode_generated(generated: Vec<GeneratedTransaction>) -> Result<Vec<TransactionDescriptor>> {
    if generated.is_empty() {
        return Err(IntentError::QuoteFailed(
            "quote produced no transactions".to_string(),
        ));
    }

    generated
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            let bytes = decode_base64(&item.txn).ok_or_else(|| {
                IntentError::QuoteFailed(format!("transaction {} is not base64", position))
            })?;
            let mut descriptor = TransactionDescriptor::decode(&bytes)?;
            if let Some(signed) = item.signed {
                let signed = decode_base64(&signed).ok_or_else(|| {
                    IntentError::QuoteFailed(format!(
                        "signed transaction {} is not base64",
                        position
                    ))
                })?;
                descriptor.authorization = Authorization::PreSigned(signed);
            }
            Ok(descriptor)
        })
        .collect()
}

#[async_trait]
impl DexQuoter for HttpDexQuoter {
    async fn quote(&self, request: &SwapRequest) -> Result<SwapQuote> {
        debug!(
            "Requesting {} quote {} -> {} for {}",
            self.provider, request.from_asset_id, request.to_asset_id, request.amount
        );

        let raw: serde_json::Value = self
            .http_client
            .get(format!("{}/quote", self.base_url))
            .query(&[
                ("from", request.from_asset_id.to_string()),
                ("to", request.to_asset_id.to_string()),
                ("amount", request.amount.to_string()),
                ("slippage", request.slippage.to_string()),
            ])
            .send()
            .await
            .map_err(quote_error)?
            .error_for_status()
            .map_err(quote_error)?
            .json()
            .await
            .map_err(quote_error)?;

        let parsed: QuoteResponse = serde_json::from_value(raw.clone())
            .map_err(|e| IntentError::QuoteFailed(e.to_string()))?;

        let generated: Vec<GeneratedTransaction> = self
            .http_client
            .post(format!("{}/transactions", self.base_url))
            .json(&TransactionsRequest {
                sender: request.sender.to_string(),
                quote: &raw,
            })
            .send()
            .await
            .map_err(quote_error)?
            .error_for_status()
            .map_err(quote_error)?
            .json()
            .await
            .map_err(quote_error)?;

        Ok(SwapQuote {
            provider: self.provider.clone(),
            expected_out: parsed.expected_out,
            price_impact: parsed.price_impact,
            transactions: decode_generated(generated)?,
            raw,
        })
    }
}
