//! Application state.

use std::collections::HashMap;
use std::sync::Arc;

use algointent_core::{ExecutionResult, Network, Result};
use algointent_engine::{Engine, PreparedPlan};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// A prepared plan and, once submitted, its outcome.
#[derive(Clone)]
pub struct PlanRecord {
    pub prepared: PreparedPlan,
    pub result: Option<ExecutionResult>,
    /// Plan this one was chained from.
    pub chained_from: Option<Uuid>,
}

impl PlanRecord {
    /// Last round in which any of the plan's transactions can still land.
    pub fn last_valid(&self) -> u64 {
        self.prepared
            .plan
            .descriptors()
            .iter()
            .map(|d| d.last_valid)
            .max()
            .unwrap_or(0)
    }
}

/// Shared application state. Plans live in process memory only, until
/// their validity window has passed.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub network: Network,
    pub plans: Arc<RwLock<HashMap<Uuid, PlanRecord>>>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            network: engine.config().network,
            engine: Arc::new(engine),
            plans: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn store_plan(&self, prepared: PreparedPlan, chained_from: Option<Uuid>) -> Uuid {
        let id = prepared.plan.id;
        let record = PlanRecord {
            prepared,
            result: None,
            chained_from,
        };
        self.plans.write().await.insert(id, record);
        id
    }

    pub async fn get_plan(&self, id: Uuid) -> Option<PlanRecord> {
        self.plans.read().await.get(&id).cloned()
    }

    /// Record the terminal result of a plan and return the one that is
    /// kept. A result already recorded is never replaced. `None` when the
    /// plan is no longer held.
    pub async fn record_result(&self, id: Uuid, result: ExecutionResult) -> Option<ExecutionResult> {
        let mut plans = self.plans.write().await;
        let record = plans.get_mut(&id)?;
        Some(record.result.get_or_insert(result).clone())
    }

    /// Drop every plan whose validity window ended before `current_round`.
    pub async fn evict_expired(&self, current_round: u64) -> usize {
        let mut plans = self.plans.write().await;
        let before = plans.len();
        plans.retain(|_, record| record.last_valid() >= current_round);
        before - plans.len()
    }

    /// Evict expired plans against the ledger's current round.
    pub async fn sweep(&self) -> Result<usize> {
        let round = self.engine.current_round().await?;
        let evicted = self.evict_expired(round).await;
        if evicted > 0 {
            debug!("Evicted {} expired plans at round {}", evicted, round);
        }
        Ok(evicted)
    }
}
