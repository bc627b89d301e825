//! The ledger node RPC surface the engine depends on.

use algointent_core::{Address, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Network parameters used to build a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedParams {
    /// Fee per byte of the signed transaction.
    pub fee_per_byte: u64,
    pub min_fee: u64,
    /// Latest round the node knows about.
    pub last_round: u64,
    pub genesis_id: String,
    pub genesis_hash: String,
}

impl SuggestedParams {
    /// Fee for a signed transaction of roughly `size` bytes.
    pub fn fee_for(&self, size: usize) -> u64 {
        self.min_fee
            .max(self.fee_per_byte.saturating_mul(size as u64))
    }
}

/// On-ledger description of an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub id: u64,
    pub decimals: u32,
    pub total: u64,
    pub creator: String,
    #[serde(default)]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Pool/confirmation state of a submitted transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub confirmed_round: Option<u64>,
    /// Set when the node evicted the transaction from its pool.
    pub pool_error: Option<String>,
    /// Id of the asset created by this transaction, once confirmed.
    pub asset_index: Option<u64>,
}

impl PendingTransaction {
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_round.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub last_round: u64,
}

/// Trait for ledger node clients.
///
/// Implementations are shared across concurrent pipelines and must not keep
/// per-plan state.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fetch current fee and validity parameters.
    async fn suggested_params(&self) -> Result<SuggestedParams>;

    /// Fetch asset metadata by id.
    async fn asset_metadata(&self, asset_id: u64) -> Result<AssetMetadata>;

    /// Balance of `asset_id` held by `account`, or `None` if not opted in.
    async fn asset_holding(&self, account: &Address, asset_id: u64) -> Result<Option<u64>>;

    /// Submit a signed group in one call. Returns the first transaction id.
    async fn submit_group(&self, signed: &[Vec<u8>]) -> Result<String>;

    /// Confirmation status by transaction id.
    async fn pending_transaction(&self, txid: &str) -> Result<PendingTransaction>;

    async fn status(&self) -> Result<NodeStatus>;

    /// Block until the node has seen a round after `round`.
    async fn wait_for_round(&self, round: u64) -> Result<NodeStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_for_respects_minimum() {
        let params = SuggestedParams {
            fee_per_byte: 0,
            min_fee: 1000,
            last_round: 1,
            genesis_id: "testnet-v1.0".to_string(),
            genesis_hash: String::new(),
        };
        assert_eq!(params.fee_for(250), 1000);

        let congested = SuggestedParams {
            fee_per_byte: 10,
            ..params
        };
        assert_eq!(congested.fee_for(250), 2500);
    }
}
