//! Ledger-backed plan builder.

use std::sync::Arc;

use algointent_core::{
    Address, AssetCreate, AssetHolding, AssetParams, Authorization, IntentError, Network,
    NormalizedOperation, OperationKind, Payout, PlanOrigin, Result, SwapOrder, TransactionDescriptor,
    TransactionKind, TransactionPlan,
};
use algointent_ledger::{DexQuoter, LedgerClient, SwapRequest};
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use crate::planner::{BuilderConfig, PlanBuilder};
use crate::resolver::{AssetResolver, ResolvedAsset};

/// Builds plans from fresh node parameters.
pub struct LedgerPlanBuilder {
    ledger: Arc<dyn LedgerClient>,
    resolver: AssetResolver,
    dex: Option<Arc<dyn DexQuoter>>,
    config: BuilderConfig,
}

impl LedgerPlanBuilder {
    pub fn new(ledger: Arc<dyn LedgerClient>, network: Network) -> Self {
        Self::with_config(ledger, network, BuilderConfig::default())
    }

    pub fn with_config(ledger: Arc<dyn LedgerClient>, network: Network, config: BuilderConfig) -> Self {
        Self {
            resolver: AssetResolver::new(ledger.clone(), network),
            ledger,
            dex: None,
            config,
        }
    }

    /// Attach the quoter used for swaps.
    pub fn with_dex(mut self, dex: Arc<dyn DexQuoter>) -> Self {
        self.dex = Some(dex);
        self
    }

    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    /// One descriptor with a freshly fetched validity window and fee.
    async fn descriptor(
        &self,
        sender: Address,
        kind: TransactionKind,
        note: Option<Vec<u8>>,
    ) -> Result<TransactionDescriptor> {
        let params = self.ledger.suggested_params().await?;

        let mut descriptor = TransactionDescriptor {
            sender,
            fee: 0,
            first_valid: params.last_round,
            last_valid: params.last_round.saturating_add(self.config.validity_rounds),
            genesis_id: params.genesis_id.clone(),
            genesis_hash: params.genesis_hash.clone(),
            note,
            group: None,
            kind,
            authorization: Authorization::Holder,
        };
        let estimated = descriptor.encode()?.len() + self.config.signature_overhead;
        descriptor.fee = params.fee_for(estimated);
        Ok(descriptor)
    }

    fn transfer_kind(asset: &ResolvedAsset, receiver: Address, amount: u64) -> TransactionKind {
        if asset.is_native() {
            TransactionKind::Payment {
                receiver,
                amount,
                close_remainder_to: None,
            }
        } else {
            TransactionKind::AssetTransfer {
                asset_id: asset.id,
                receiver,
                amount,
                close_to: None,
            }
        }
    }

    fn check_group_size(&self, count: usize) -> Result<()> {
        if count > self.config.max_group_size {
            return Err(IntentError::GroupTooLarge {
                max: self.config.max_group_size,
                found: count,
            });
        }
        Ok(())
    }

    async fn transfers(
        &self,
        plan: &mut TransactionPlan,
        sender: Address,
        asset: &ResolvedAsset,
        payouts: &[Payout],
    ) -> Result<()> {
        self.check_group_size(payouts.len())?;

        // Scale every amount before the first parameter fetch.
        let amounts = payouts
            .iter()
            .enumerate()
            .map(|(i, p)| asset.to_base_units(&format!("recipients[{}].amount", i), p.amount))
            .collect::<Result<Vec<_>>>()?;

        for (payout, amount) in payouts.iter().zip(amounts) {
            let kind = Self::transfer_kind(asset, payout.receiver, amount);
            plan.push(self.descriptor(sender, kind, None).await?)?;
        }
        Ok(())
    }

    async fn asset_create(&self, plan: &mut TransactionPlan, create: &AssetCreate) -> Result<()> {
        let creator = create.creator;
        let params = AssetParams {
            total: create.total,
            decimals: create.decimals,
            default_frozen: create.default_frozen,
            unit_name: create.unit_name.clone(),
            asset_name: create.name.clone(),
            url: create.url.clone(),
            manager: Some(create.manager.unwrap_or(creator)),
            reserve: Some(create.reserve.unwrap_or(creator)),
            freeze: Some(create.freeze.unwrap_or(creator)),
            clawback: Some(create.clawback.unwrap_or(creator)),
        };
        let note = create
            .description
            .as_ref()
            .filter(|d| !d.is_empty())
            .map(|d| d.as_bytes().to_vec());

        let kind = TransactionKind::AssetCreate { params };
        plan.push(self.descriptor(creator, kind, note).await?)
    }

    async fn opt_in(&self, plan: &mut TransactionPlan, holding: &AssetHolding) -> Result<()> {
        // Fails with NotFound for an asset that does not exist.
        self.ledger.asset_metadata(holding.asset_id).await?;

        let kind = TransactionKind::AssetTransfer {
            asset_id: holding.asset_id,
            receiver: holding.account,
            amount: 0,
            close_to: None,
        };
        plan.push(self.descriptor(holding.account, kind, None).await?)
    }

    async fn opt_out(&self, plan: &mut TransactionPlan, holding: &AssetHolding) -> Result<()> {
        let balance = self
            .ledger
            .asset_holding(&holding.account, holding.asset_id)
            .await?
            .ok_or_else(|| IntentError::InvalidField {
                field: "asset_id".to_string(),
                message: format!(
                    "{} is not opted in to asset {}",
                    holding.account, holding.asset_id
                ),
            })?;
        if balance > 0 {
            return Err(IntentError::NonZeroBalance {
                asset_id: holding.asset_id,
                balance,
            });
        }

        let metadata = self.ledger.asset_metadata(holding.asset_id).await?;
        let creator = Address::parse_field("creator", &metadata.creator)?;
        let kind = TransactionKind::AssetTransfer {
            asset_id: holding.asset_id,
            receiver: creator,
            amount: 0,
            close_to: Some(creator),
        };
        plan.push(self.descriptor(holding.account, kind, None).await?)
    }

    async fn swap(&self, order: &SwapOrder) -> Result<TransactionPlan> {
        let dex = self
            .dex
            .as_ref()
            .ok_or_else(|| IntentError::QuoteFailed("no DEX quoter configured".to_string()))?;

        let from = self.resolver.resolve(&order.from_asset).await?;
        let to = self.resolver.resolve(&order.to_asset).await?;
        let request = SwapRequest {
            sender: order.sender,
            from_asset_id: from.id,
            to_asset_id: to.id,
            amount: from.to_base_units("amount", order.amount)?,
            slippage: order.slippage,
        };

        let quote = dex.quote(&request).await?;
        self.check_group_size(quote.transactions.len())?;
        info!(
            "Swap quote from {}: {} -> {} expected out {}",
            quote.provider, request.amount, to.id, quote.expected_out
        );

        let mut plan = TransactionPlan::new(
            OperationKind::Swap,
            PlanOrigin::External {
                provider: quote.provider.clone(),
            },
        );
        for descriptor in quote.transactions {
            plan.push(descriptor)?;
        }
        plan.metadata = json!({
            "provider": quote.provider,
            "expected_out": quote.expected_out,
            "price_impact": quote.price_impact,
            "quote": quote.raw,
        });
        Ok(plan)
    }
}

#[async_trait]
impl PlanBuilder for LedgerPlanBuilder {
    async fn build(&self, operation: &NormalizedOperation) -> Result<TransactionPlan> {
        let mut plan = TransactionPlan::new(operation.kind(), PlanOrigin::Engine);
        match operation {
            NormalizedOperation::TransferSingle(transfer) => {
                let asset = self.resolver.resolve(&transfer.asset).await?;
                self.transfers(&mut plan, transfer.sender, &asset, std::slice::from_ref(&transfer.payout))
                    .await?;
            }
            NormalizedOperation::TransferMulti(multi) => {
                let asset = self.resolver.resolve(&multi.asset).await?;
                self.transfers(&mut plan, multi.sender, &asset, &multi.payouts)
                    .await?;
            }
            NormalizedOperation::AssetTransfer(transfer) => {
                let asset = self.resolver.resolve(&transfer.asset_id.to_string()).await?;
                self.transfers(&mut plan, transfer.sender, &asset, &transfer.payouts)
                    .await?;
            }
            NormalizedOperation::AssetCreate(create) => self.asset_create(&mut plan, create).await?,
            NormalizedOperation::AssetOptIn(holding) => self.opt_in(&mut plan, holding).await?,
            NormalizedOperation::AssetOptOut(holding) => self.opt_out(&mut plan, holding).await?,
            NormalizedOperation::Swap(order) => return self.swap(order).await,
        }

        debug!(
            "Built {} plan {} with {} descriptors, total fee {}",
            plan.operation,
            plan.id,
            plan.len(),
            plan.total_fee()
        );
        Ok(plan)
    }

    fn config(&self) -> &BuilderConfig {
        &self.config
    }
}
