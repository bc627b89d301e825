//! Follow-up actions derived from a finished plan.

use algointent_core::{AssetHolding, ChainedAction, ExecutionResult, NormalizedOperation};

/// The follow-up for `result`, if any. Pure: the caller runs it as a new
/// plan.
///
/// A confirmed asset creation yields an opt-in to the new asset for the
/// creating account.
pub fn chain(result: &ExecutionResult, original: &NormalizedOperation) -> Option<ChainedAction> {
    if !result.is_success() {
        return None;
    }
    match original {
        NormalizedOperation::AssetCreate(create) => {
            let asset_id = result.created_resource_id?;
            Some(ChainedAction {
                triggered_by: result.id,
                reason: format!("opt in to newly created asset {}", asset_id),
                operation: NormalizedOperation::AssetOptIn(AssetHolding {
                    account: create.creator,
                    asset_id,
                }),
            })
        }
        _ => None,
    }
}
