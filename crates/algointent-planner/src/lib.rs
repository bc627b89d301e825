//! # Algo Intent Planner
//!
//! Turns a [`NormalizedOperation`](algointent_core::NormalizedOperation)
//! into a grouped [`TransactionPlan`](algointent_core::TransactionPlan).

pub mod builder;
pub mod group;
pub mod planner;
pub mod resolver;

pub use builder::LedgerPlanBuilder;
pub use group::AtomicGroupCoordinator;
pub use planner::{BuilderConfig, PlanBuilder};
pub use resolver::{AssetRegistry, AssetResolver, ResolvedAsset, NATIVE_ASSET_ID, NATIVE_DECIMALS};
