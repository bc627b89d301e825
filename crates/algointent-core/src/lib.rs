//! # Algo Intent Core
//!
//! Core primitives for turning structured intents into atomically grouped
//! ledger transactions.
//!
//! This crate provides the fundamental building blocks:
//! - [`Intent`] and [`NormalizedOperation`] - what the caller asked for
//! - [`normalize`] - the pure validation step between the two
//! - [`TransactionPlan`] - ordered unsigned descriptors plus group digest
//! - [`SignedGroup`] - signed bytes in plan order
//! - [`ExecutionResult`] - terminal outcome
//! - [`IntentError`] - error taxonomy

pub mod address;
pub mod encoding;
pub mod error;
pub mod intent;
pub mod normalize;
pub mod plan;
pub mod result;
pub mod signed;
pub mod types;

// Re-exports for convenience
pub use address::Address;
pub use error::{IntentError, Result};
pub use intent::{
    AssetCreate, AssetHolding, AssetTransfer, Intent, IntentBuilder, MultiTransfer,
    NormalizedOperation, Payout, SwapOrder, Transfer, NATIVE_SYMBOL,
};
pub use normalize::normalize;
pub use plan::{
    compute_group_id, AssetParams, Authorization, GroupId, PlanOrigin, TransactionDescriptor,
    TransactionKind, TransactionPlan,
};
pub use result::{ChainedAction, ExecutionResult, ExecutionStatus};
pub use signed::{encode_signed, SignedGroup, SignedTransaction};
pub use types::*;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::address::Address;
    pub use crate::error::{IntentError, Result};
    pub use crate::intent::{Intent, NormalizedOperation};
    pub use crate::normalize::normalize;
    pub use crate::plan::{TransactionDescriptor, TransactionKind, TransactionPlan};
    pub use crate::result::{ChainedAction, ExecutionResult, ExecutionStatus};
    pub use crate::signed::{SignedGroup, SignedTransaction};
    pub use crate::types::{ErrorKind, Network, OperationKind};
}
