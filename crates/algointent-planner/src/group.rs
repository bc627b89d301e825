//! Atomic group coordination.

use algointent_core::{compute_group_id, IntentError, Result, TransactionPlan};
use tracing::debug;

use crate::planner::BuilderConfig;

/// Stamps multi-descriptor plans with their group digest.
///
/// Grouping is the last change a plan receives before signing.
#[derive(Debug, Clone)]
pub struct AtomicGroupCoordinator {
    max_group_size: usize,
}

impl Default for AtomicGroupCoordinator {
    fn default() -> Self {
        Self::new(&BuilderConfig::default())
    }
}

impl AtomicGroupCoordinator {
    pub fn new(config: &BuilderConfig) -> Self {
        Self {
            max_group_size: config.max_group_size,
        }
    }

    pub fn group(&self, mut plan: TransactionPlan) -> Result<TransactionPlan> {
        if plan.is_empty() {
            return Err(IntentError::Internal("cannot group an empty plan".to_string()));
        }
        if plan.len() > self.max_group_size {
            return Err(IntentError::GroupTooLarge {
                max: self.max_group_size,
                found: plan.len(),
            });
        }
        if plan.is_grouped() {
            plan.verify_group()?;
            return Ok(plan);
        }

        let stamped = plan.descriptors().iter().any(|d| d.group.is_some());
        if stamped {
            // Supplied pre-grouped by a collaborator.
            let group = plan.adopt_group()?;
            debug!("Adopted group {} for plan {}", group, plan.id);
            return Ok(plan);
        }

        if plan.len() == 1 {
            return Ok(plan);
        }

        if plan.has_presigned() {
            return Err(IntentError::Internal(
                "pre-signed transactions arrived ungrouped; regrouping would invalidate them"
                    .to_string(),
            ));
        }

        let group = compute_group_id(plan.descriptors())?;
        plan.assign_group(group)?;
        debug!(
            "Grouped plan {} ({} descriptors) as {}",
            plan.id,
            plan.len(),
            group
        );
        Ok(plan)
    }
}
