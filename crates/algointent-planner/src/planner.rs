//! Plan builder trait and configuration.

use algointent_core::{NormalizedOperation, Result, TransactionPlan};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for plan building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Width of each descriptor's validity window, in rounds.
    pub validity_rounds: u64,

    /// Bytes added to the unsigned size when estimating the signed size.
    pub signature_overhead: usize,

    /// Maximum number of descriptors in one atomic group.
    pub max_group_size: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            validity_rounds: 1_000,
            signature_overhead: 75,
            max_group_size: algointent_core::normalize::MAX_GROUP_SIZE,
        }
    }
}

/// Trait for plan builders.
#[async_trait]
pub trait PlanBuilder: Send + Sync {
    /// Build an ungrouped plan for the operation.
    ///
    /// Suggested parameters are fetched fresh for every descriptor.
    async fn build(&self, operation: &NormalizedOperation) -> Result<TransactionPlan>;

    fn config(&self) -> &BuilderConfig;
}
