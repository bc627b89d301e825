//! In-memory simulated ledger.
//!
//! Applies submitted groups atomically against local balances and holdings,
//! enforces validity windows and group consistency, and confirms after a
//! configurable number of rounds. Used for tests and local dry runs.

use std::collections::HashMap;
use std::sync::Arc;

use algointent_core::{
    compute_group_id, Address, IntentError, Network, Result, SignedTransaction,
    TransactionDescriptor, TransactionKind,
};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::client::{AssetMetadata, LedgerClient, NodeStatus, PendingTransaction, SuggestedParams};

const GENESIS_HASH: &str = "SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=";
const FIRST_ASSET_ID: u64 = 1_000;

#[derive(Debug, Clone)]
struct PendingEntry {
    submitted_round: u64,
    asset_index: Option<u64>,
}

#[derive(Debug, Clone)]
struct LedgerState {
    round: u64,
    fee_per_byte: u64,
    min_fee: u64,
    balances: HashMap<Address, u64>,
    holdings: HashMap<(Address, u64), u64>,
    assets: HashMap<u64, AssetMetadata>,
    next_asset_id: u64,
    transactions: HashMap<String, PendingEntry>,
    /// Rounds between submission and confirmation; `None` never confirms.
    confirmation_delay: Option<u64>,
    pool_error: Option<String>,
    reject_next: Option<String>,
    fail_params: bool,
    submissions: usize,
    submit_attempts: usize,
    params_fetches: usize,
    metadata_fetches: usize,
}

/// Deterministic stand-in for a ledger node.
#[derive(Clone)]
pub struct InMemoryLedger {
    network: Network,
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    /// Create a ledger at round 1000 that confirms on the next round.
    pub fn new(network: Network) -> Self {
        Self {
            network,
            state: Arc::new(RwLock::new(LedgerState {
                round: 1_000,
                fee_per_byte: 0,
                min_fee: 1_000,
                balances: HashMap::new(),
                holdings: HashMap::new(),
                assets: HashMap::new(),
                next_asset_id: FIRST_ASSET_ID,
                transactions: HashMap::new(),
                confirmation_delay: Some(1),
                pool_error: None,
                reject_next: None,
                fail_params: false,
                submissions: 0,
                submit_attempts: 0,
                params_fetches: 0,
                metadata_fetches: 0,
            })),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Credit native base units to an account.
    pub async fn fund(&self, account: &Address, amount: u64) {
        let mut state = self.state.write().await;
        *state.balances.entry(*account).or_insert(0) += amount;
    }

    /// Register an existing asset, crediting its total to the creator.
    pub async fn register_asset(&self, metadata: AssetMetadata) -> Result<()> {
        let creator = Address::parse_field("creator", &metadata.creator)?;
        let mut state = self.state.write().await;
        state.holdings.insert((creator, metadata.id), metadata.total);
        state.assets.insert(metadata.id, metadata);
        Ok(())
    }

    pub async fn set_holding(&self, account: &Address, asset_id: u64, amount: u64) {
        let mut state = self.state.write().await;
        state.holdings.insert((*account, asset_id), amount);
    }

    pub async fn set_confirmation_delay(&self, rounds: Option<u64>) {
        self.state.write().await.confirmation_delay = rounds;
    }

    /// Report `message` as the pool error for every later status query.
    pub async fn set_pool_error(&self, message: Option<String>) {
        self.state.write().await.pool_error = message;
    }

    pub async fn reject_next_submission(&self, message: impl Into<String>) {
        self.state.write().await.reject_next = Some(message.into());
    }

    pub async fn fail_params(&self, fail: bool) {
        self.state.write().await.fail_params = fail;
    }

    pub async fn set_fees(&self, fee_per_byte: u64, min_fee: u64) {
        let mut state = self.state.write().await;
        state.fee_per_byte = fee_per_byte;
        state.min_fee = min_fee;
    }

    pub async fn advance_rounds(&self, rounds: u64) {
        self.state.write().await.round += rounds;
    }

    pub async fn current_round(&self) -> u64 {
        self.state.read().await.round
    }

    pub async fn balance(&self, account: &Address) -> u64 {
        self.state
            .read()
            .await
            .balances
            .get(account)
            .copied()
            .unwrap_or(0)
    }

    pub async fn holding(&self, account: &Address, asset_id: u64) -> Option<u64> {
        self.state
            .read()
            .await
            .holdings
            .get(&(*account, asset_id))
            .copied()
    }

    /// Number of groups the ledger accepted.
    pub async fn submission_count(&self) -> usize {
        self.state.read().await.submissions
    }

    /// Number of submit calls, accepted or not.
    pub async fn submit_attempts(&self) -> usize {
        self.state.read().await.submit_attempts
    }

    pub async fn params_fetch_count(&self) -> usize {
        self.state.read().await.params_fetches
    }

    pub async fn metadata_fetch_count(&self) -> usize {
        self.state.read().await.metadata_fetches
    }
}

fn rejected(message: impl Into<String>) -> IntentError {
    IntentError::SubmissionRejected {
        message: message.into(),
    }
}

impl LedgerState {
    fn debit(&mut self, account: &Address, amount: u64) -> Result<()> {
        let balance = self.balances.get(account).copied().unwrap_or(0);
        if balance < amount {
            return Err(rejected(format!(
                "overspend (account {}, data {{balance: {}}}, tried to spend {})",
                account, balance, amount
            )));
        }
        self.balances.insert(*account, balance - amount);
        Ok(())
    }

    fn credit(&mut self, account: &Address, amount: u64) {
        *self.balances.entry(*account).or_insert(0) += amount;
    }

    /// Apply one transaction. Returns the id of an asset it created.
    fn apply(&mut self, txn: &TransactionDescriptor) -> Result<Option<u64>> {
        self.debit(&txn.sender, txn.fee)?;

        match &txn.kind {
            TransactionKind::Payment {
                receiver,
                amount,
                close_remainder_to,
            } => {
                self.debit(&txn.sender, *amount)?;
                self.credit(receiver, *amount);
                if let Some(close_to) = close_remainder_to {
                    let rest = self.balances.remove(&txn.sender).unwrap_or(0);
                    self.credit(close_to, rest);
                }
                Ok(None)
            }
            TransactionKind::AssetTransfer {
                asset_id,
                receiver,
                amount,
                close_to,
            } => {
                if !self.assets.contains_key(asset_id) {
                    return Err(rejected(format!("asset {} does not exist", asset_id)));
                }
                let opt_in = *receiver == txn.sender && *amount == 0 && close_to.is_none();
                if opt_in {
                    self.holdings.entry((txn.sender, *asset_id)).or_insert(0);
                    return Ok(None);
                }

                let held = self
                    .holdings
                    .get(&(txn.sender, *asset_id))
                    .copied()
                    .ok_or_else(|| {
                        rejected(format!(
                            "asset {} missing from {}",
                            asset_id, txn.sender
                        ))
                    })?;
                if !self.holdings.contains_key(&(*receiver, *asset_id)) {
                    return Err(rejected(format!(
                        "receiver {} must optin to asset {}",
                        receiver, asset_id
                    )));
                }
                if held < *amount {
                    return Err(rejected(format!(
                        "underflow on subtracting {} from sender amount {}",
                        amount, held
                    )));
                }
                self.holdings.insert((txn.sender, *asset_id), held - amount);
                *self.holdings.entry((*receiver, *asset_id)).or_insert(0) += amount;

                if let Some(close_to) = close_to {
                    let rest = self
                        .holdings
                        .remove(&(txn.sender, *asset_id))
                        .unwrap_or(0);
                    if !self.holdings.contains_key(&(*close_to, *asset_id)) {
                        return Err(rejected(format!(
                            "close-to {} must optin to asset {}",
                            close_to, asset_id
                        )));
                    }
                    *self.holdings.entry((*close_to, *asset_id)).or_insert(0) += rest;
                }
                Ok(None)
            }
            TransactionKind::AssetCreate { params } => {
                let id = self.next_asset_id;
                self.next_asset_id += 1;
                self.assets.insert(
                    id,
                    AssetMetadata {
                        id,
                        decimals: params.decimals,
                        total: params.total,
                        creator: txn.sender.to_string(),
                        unit_name: Some(params.unit_name.clone()),
                        name: Some(params.asset_name.clone()),
                    },
                );
                self.holdings.insert((txn.sender, id), params.total);
                Ok(Some(id))
            }
            TransactionKind::ApplicationCall { .. } => Ok(None),
        }
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn suggested_params(&self) -> Result<SuggestedParams> {
        let mut state = self.state.write().await;
        state.params_fetches += 1;
        if state.fail_params {
            return Err(IntentError::Network {
                message: "connection refused".to_string(),
            });
        }
        Ok(SuggestedParams {
            fee_per_byte: state.fee_per_byte,
            min_fee: state.min_fee,
            last_round: state.round,
            genesis_id: self.network.genesis_id().to_string(),
            genesis_hash: GENESIS_HASH.to_string(),
        })
    }

    async fn asset_metadata(&self, asset_id: u64) -> Result<AssetMetadata> {
        let mut state = self.state.write().await;
        state.metadata_fetches += 1;
        state
            .assets
            .get(&asset_id)
            .cloned()
            .ok_or_else(|| IntentError::NotFound {
                resource_type: "asset".to_string(),
                id: asset_id.to_string(),
            })
    }

    async fn asset_holding(&self, account: &Address, asset_id: u64) -> Result<Option<u64>> {
        Ok(self.holding(account, asset_id).await)
    }

    async fn submit_group(&self, signed: &[Vec<u8>]) -> Result<String> {
        let mut state = self.state.write().await;
        state.submit_attempts += 1;

        if let Some(message) = state.reject_next.take() {
            return Err(rejected(message));
        }
        if signed.is_empty() {
            return Err(rejected("empty transaction group"));
        }

        let mut transactions = Vec::with_capacity(signed.len());
        for (position, bytes) in signed.iter().enumerate() {
            let txn = SignedTransaction::from_bytes(position, bytes.clone())
                .map_err(|e| rejected(format!("msgpack decode error: {}", e)))?;
            transactions.push(txn);
        }

        for txn in &transactions {
            if state.transactions.contains_key(&txn.txid) {
                return Err(IntentError::AlreadySubmitted {
                    message: format!("transaction {}: transaction already in ledger", txn.txid),
                });
            }
            if !txn.descriptor.is_valid_at(state.round) {
                return Err(rejected(format!(
                    "txn dead: round {} outside of {}--{}",
                    state.round, txn.descriptor.first_valid, txn.descriptor.last_valid
                )));
            }
            if txn.descriptor.genesis_id != self.network.genesis_id() {
                return Err(rejected(format!(
                    "transaction genesis {} does not match {}",
                    txn.descriptor.genesis_id,
                    self.network.genesis_id()
                )));
            }
        }

        if transactions.len() > 1 {
            let descriptors: Vec<TransactionDescriptor> =
                transactions.iter().map(|t| t.descriptor.clone()).collect();
            let computed = compute_group_id(&descriptors)?;
            if descriptors.iter().any(|d| d.group != Some(computed)) {
                return Err(rejected("transaction group mismatch: incomplete group"));
            }
        } else if transactions[0].descriptor.group.is_some() {
            return Err(rejected("transaction group mismatch: incomplete group"));
        }

        // Apply against a scratch copy so a failing member leaves no trace.
        let mut scratch = state.clone();
        let mut created = Vec::with_capacity(transactions.len());
        for txn in &transactions {
            created.push(scratch.apply(&txn.descriptor)?);
        }
        *state = scratch;

        let round = state.round;
        for (txn, asset_index) in transactions.iter().zip(created) {
            state.transactions.insert(
                txn.txid.clone(),
                PendingEntry {
                    submitted_round: round,
                    asset_index,
                },
            );
        }
        state.submissions += 1;

        let first = transactions[0].txid.clone();
        debug!("Simulated ledger accepted group of {} at round {}", transactions.len(), round);
        Ok(first)
    }

    async fn pending_transaction(&self, txid: &str) -> Result<PendingTransaction> {
        let state = self.state.read().await;
        let entry = state
            .transactions
            .get(txid)
            .ok_or_else(|| IntentError::NotFound {
                resource_type: "transaction".to_string(),
                id: txid.to_string(),
            })?;

        if let Some(error) = &state.pool_error {
            return Ok(PendingTransaction {
                confirmed_round: None,
                pool_error: Some(error.clone()),
                asset_index: None,
            });
        }

        let confirmed_round = state
            .confirmation_delay
            .map(|delay| entry.submitted_round + delay)
            .filter(|round| *round <= state.round);

        Ok(PendingTransaction {
            confirmed_round,
            pool_error: None,
            asset_index: confirmed_round.and(entry.asset_index),
        })
    }

    async fn status(&self) -> Result<NodeStatus> {
        Ok(NodeStatus {
            last_round: self.state.read().await.round,
        })
    }

    async fn wait_for_round(&self, round: u64) -> Result<NodeStatus> {
        let mut state = self.state.write().await;
        if state.round <= round {
            state.round = round + 1;
        }
        Ok(NodeStatus {
            last_round: state.round,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use algointent_core::{encode_signed, Authorization};

    fn account(seed: u8) -> Address {
        Address::from_public_key([seed; 32])
    }

    fn payment(ledger_round: u64, from: u8, to: u8, amount: u64) -> TransactionDescriptor {
        TransactionDescriptor {
            sender: account(from),
            fee: 1_000,
            first_valid: ledger_round,
            last_valid: ledger_round + 1_000,
            genesis_id: "testnet-v1.0".to_string(),
            genesis_hash: GENESIS_HASH.to_string(),
            note: None,
            group: None,
            kind: TransactionKind::Payment {
                receiver: account(to),
                amount,
                close_remainder_to: None,
            },
            authorization: Authorization::Holder,
        }
    }

    fn sign(descriptor: &TransactionDescriptor) -> Vec<u8> {
        encode_signed(&descriptor.encode().unwrap(), &[0; 64]).unwrap()
    }

    #[tokio::test]
    async fn test_payment_confirms_next_round() {
        let ledger = InMemoryLedger::new(Network::TestNet);
        ledger.fund(&account(1), 10_000_000).await;

        let txn = payment(1_000, 1, 2, 5_000_000);
        let txid = ledger.submit_group(&[sign(&txn)]).await.unwrap();
        assert_eq!(txid, txn.txid().unwrap());
        assert_eq!(ledger.balance(&account(2)).await, 5_000_000);
        assert_eq!(ledger.balance(&account(1)).await, 4_999_000);

        let pending = ledger.pending_transaction(&txid).await.unwrap();
        assert!(!pending.is_confirmed());

        ledger.wait_for_round(1_000).await.unwrap();
        let pending = ledger.pending_transaction(&txid).await.unwrap();
        assert_eq!(pending.confirmed_round, Some(1_001));
    }

    #[tokio::test]
    async fn test_overspend_rejected() {
        let ledger = InMemoryLedger::new(Network::TestNet);
        ledger.fund(&account(1), 1_000).await;
        let err = ledger
            .submit_group(&[sign(&payment(1_000, 1, 2, 5))])
            .await
            .unwrap_err();
        assert!(matches!(err, IntentError::SubmissionRejected { ref message } if message.starts_with("overspend")));
        assert_eq!(ledger.submission_count().await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_detected() {
        let ledger = InMemoryLedger::new(Network::TestNet);
        ledger.fund(&account(1), 10_000_000).await;
        let signed = sign(&payment(1_000, 1, 2, 5));
        ledger.submit_group(&[signed.clone()]).await.unwrap();
        let err = ledger.submit_group(&[signed]).await.unwrap_err();
        assert!(matches!(err, IntentError::AlreadySubmitted { .. }));
        assert_eq!(ledger.submission_count().await, 1);
    }

    #[tokio::test]
    async fn test_stale_window_rejected() {
        let ledger = InMemoryLedger::new(Network::TestNet);
        ledger.fund(&account(1), 10_000_000).await;
        ledger.advance_rounds(5_000).await;
        let err = ledger
            .submit_group(&[sign(&payment(1_000, 1, 2, 5))])
            .await
            .unwrap_err();
        assert!(matches!(err, IntentError::SubmissionRejected { ref message } if message.starts_with("txn dead")));
    }

    #[tokio::test]
    async fn test_ungrouped_multi_rejected_atomically() {
        let ledger = InMemoryLedger::new(Network::TestNet);
        ledger.fund(&account(1), 10_000_000).await;
        let a = sign(&payment(1_000, 1, 2, 5));
        let b = sign(&payment(1_000, 1, 3, 5));
        assert!(ledger.submit_group(&[a, b]).await.is_err());
        assert_eq!(ledger.balance(&account(2)).await, 0);
    }

    #[tokio::test]
    async fn test_asset_transfer_requires_opt_in() {
        let ledger = InMemoryLedger::new(Network::TestNet);
        ledger.fund(&account(1), 10_000_000).await;
        ledger
            .register_asset(AssetMetadata {
                id: 77,
                decimals: 0,
                total: 10,
                creator: account(1).to_string(),
                unit_name: Some("U".to_string()),
                name: Some("Universe".to_string()),
            })
            .await
            .unwrap();

        let mut txn = payment(1_000, 1, 2, 0);
        txn.kind = TransactionKind::AssetTransfer {
            asset_id: 77,
            receiver: account(2),
            amount: 1,
            close_to: None,
        };
        let err = ledger.submit_group(&[sign(&txn)]).await.unwrap_err();
        assert!(err.to_string().contains("must optin"));
    }

    #[tokio::test]
    async fn test_never_confirming_ledger() {
        let ledger = InMemoryLedger::new(Network::TestNet);
        ledger.fund(&account(1), 10_000_000).await;
        ledger.set_confirmation_delay(None).await;
        let txid = ledger
            .submit_group(&[sign(&payment(1_000, 1, 2, 5))])
            .await
            .unwrap();
        ledger.advance_rounds(100).await;
        assert!(!ledger.pending_transaction(&txid).await.unwrap().is_confirmed());
    }
}
