//! The intent pipeline.

use std::sync::Arc;

use algointent_core::{
    normalize, ChainedAction, ExecutionResult, Intent, IntentError, NormalizedOperation, Result,
    TransactionPlan,
};
use algointent_ledger::{DexQuoter, LedgerClient, MediaStore};
use algointent_planner::{AtomicGroupCoordinator, LedgerPlanBuilder, PlanBuilder};
use algointent_signer::SigningDelegate;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chainer::chain;
use crate::config::EngineConfig;
use crate::signing::collect_signatures;
use crate::tracker::SubmissionTracker;

/// A grouped plan ready for signing.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedPlan {
    pub operation: NormalizedOperation,
    pub plan: TransactionPlan,
}

/// Outcome of a chained follow-up, reported next to the original.
#[derive(Debug, Clone, Serialize)]
pub struct ChainedReport {
    pub action: ChainedAction,
    pub plan_id: Option<Uuid>,
    pub result: ExecutionResult,
}

/// Everything one `execute` call produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub operation: Option<NormalizedOperation>,
    pub plan_id: Option<Uuid>,
    pub result: ExecutionResult,
    pub chained: Option<ChainedReport>,
}

impl ExecutionReport {
    fn failed(operation: Option<NormalizedOperation>, plan_id: Option<Uuid>, error: &IntentError) -> Self {
        Self {
            operation,
            plan_id,
            result: ExecutionResult::failure(plan_id, error),
            chained: None,
        }
    }
}

/// The orchestration engine.
///
/// Holds only shared, stateless handles; every call owns its own plan,
/// signatures and result.
pub struct Engine {
    config: EngineConfig,
    ledger: Arc<dyn LedgerClient>,
    builder: Arc<dyn PlanBuilder>,
    coordinator: AtomicGroupCoordinator,
    tracker: SubmissionTracker,
    media: Option<Arc<dyn MediaStore>>,
}

impl Engine {
    pub fn new(ledger: Arc<dyn LedgerClient>, config: EngineConfig) -> Self {
        let builder = LedgerPlanBuilder::with_config(
            ledger.clone(),
            config.network,
            config.builder.clone(),
        );
        Self {
            coordinator: AtomicGroupCoordinator::new(&config.builder),
            tracker: SubmissionTracker::new(ledger.clone(), config.max_poll_rounds),
            builder: Arc::new(builder),
            ledger,
            config,
            media: None,
        }
    }

    /// Use `dex` to build swap plans.
    pub fn with_dex(mut self, dex: Arc<dyn DexQuoter>) -> Self {
        let builder = LedgerPlanBuilder::with_config(
            self.ledger.clone(),
            self.config.network,
            self.config.builder.clone(),
        )
        .with_dex(dex);
        self.builder = Arc::new(builder);
        self
    }

    pub fn with_media(mut self, media: Arc<dyn MediaStore>) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_builder(mut self, builder: Arc<dyn PlanBuilder>) -> Self {
        self.builder = builder;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Latest round the ledger node has seen.
    pub async fn current_round(&self) -> Result<u64> {
        Ok(self.ledger.status().await?.last_round)
    }

    /// Normalize, build and group without signing. No side effects on the
    /// ledger.
    pub async fn prepare(&self, intent: &Intent) -> Result<PreparedPlan> {
        let operation = normalize(intent)?;
        let plan = self.prepare_operation(&operation).await?;
        Ok(PreparedPlan { operation, plan })
    }

    /// Build and group a plan for an already normalized operation.
    pub async fn prepare_operation(&self, operation: &NormalizedOperation) -> Result<TransactionPlan> {
        let plan = self.builder.build(operation).await?;
        let plan = self.coordinator.group(plan)?;
        info!(
            "📋 Prepared {} plan {} ({} transactions, group {})",
            plan.operation,
            plan.id,
            plan.len(),
            plan.group()
                .map(ToString::to_string)
                .unwrap_or_else(|| "none".to_string())
        );
        Ok(plan)
    }

    /// Sign and submit a prepared plan.
    pub async fn submit_plan(
        &self,
        plan: &TransactionPlan,
        delegate: &dyn SigningDelegate,
    ) -> ExecutionResult {
        let signed = match collect_signatures(plan, delegate).await {
            Ok(signed) => signed,
            Err(e) => {
                warn!("Plan {} not submitted: {}", plan.id, e);
                return ExecutionResult::rejected(plan, None, &e);
            }
        };
        self.tracker.submit(plan, &signed).await
    }

    /// Run the whole pipeline for one intent, then any chained action.
    pub async fn execute(&self, intent: &Intent, delegate: &dyn SigningDelegate) -> ExecutionReport {
        let operation = match normalize(intent) {
            Ok(operation) => operation,
            Err(e) => {
                warn!("Intent '{}' rejected: {}", intent.operation, e);
                return ExecutionReport::failed(None, None, &e);
            }
        };
        self.execute_operation(operation, delegate).await
    }

    /// Run an asset-creation intent whose url comes from uploaded media.
    pub async fn execute_with_media(
        &self,
        intent: &Intent,
        file_name: &str,
        media: &[u8],
        delegate: &dyn SigningDelegate,
    ) -> ExecutionReport {
        let operation = match self.attach_media(intent, file_name, media).await {
            Ok(operation) => operation,
            Err(e) => {
                warn!("Media intent rejected: {}", e);
                return ExecutionReport::failed(None, None, &e);
            }
        };
        self.execute_operation(operation, delegate).await
    }

    async fn attach_media(
        &self,
        intent: &Intent,
        file_name: &str,
        media: &[u8],
    ) -> Result<NormalizedOperation> {
        let NormalizedOperation::AssetCreate(mut create) = normalize(intent)? else {
            return Err(IntentError::InvalidField {
                field: "operation".to_string(),
                message: "media can only be attached to asset creation".to_string(),
            });
        };
        let store = self
            .media
            .as_ref()
            .ok_or_else(|| IntentError::Config("no media store configured".to_string()))?;

        let locator = store.upload(file_name, media).await?;
        info!("Uploaded {} ({} bytes) to {}", file_name, media.len(), locator);
        create.url = Some(locator);
        Ok(NormalizedOperation::AssetCreate(create))
    }

    async fn execute_operation(
        &self,
        operation: NormalizedOperation,
        delegate: &dyn SigningDelegate,
    ) -> ExecutionReport {
        let plan = match self.prepare_operation(&operation).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Could not build {} plan: {}", operation.kind(), e);
                return ExecutionReport::failed(Some(operation), None, &e);
            }
        };

        let result = self.submit_plan(&plan, delegate).await;
        let chained = match self.chain(&result, &operation) {
            Some(action) => Some(self.run_chained(action, delegate).await),
            None => None,
        };

        ExecutionReport {
            operation: Some(operation),
            plan_id: Some(plan.id),
            result,
            chained,
        }
    }

    /// The follow-up for a result, honoring `auto_opt_in`.
    pub fn chain(
        &self,
        result: &ExecutionResult,
        operation: &NormalizedOperation,
    ) -> Option<ChainedAction> {
        if !self.config.auto_opt_in {
            return None;
        }
        chain(result, operation)
    }

    /// Run a chained action as an independent plan. Its outcome never
    /// changes the result that triggered it.
    pub async fn run_chained(
        &self,
        action: ChainedAction,
        delegate: &dyn SigningDelegate,
    ) -> ChainedReport {
        info!("🔗 Running chained action: {}", action.reason);
        match self.prepare_operation(&action.operation).await {
            Ok(plan) => {
                let result = self.submit_plan(&plan, delegate).await.as_chained();
                ChainedReport {
                    plan_id: Some(plan.id),
                    action,
                    result,
                }
            }
            Err(e) => {
                error!("Chained action failed to build: {}", e);
                ChainedReport {
                    plan_id: None,
                    result: ExecutionResult::failure(None, &e).as_chained(),
                    action,
                }
            }
        }
    }
}
