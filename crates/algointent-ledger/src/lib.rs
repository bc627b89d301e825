//! # Algo Intent Ledger
//!
//! Everything the engine talks to over the network: the ledger node, the
//! DEX-quote service and the media store. [`InMemoryLedger`] simulates a
//! node for tests and dry runs.

pub mod algod;
pub mod client;
pub mod dex;
pub mod media;
pub mod memory;

pub use algod::{AlgodClient, AlgodConfig};
pub use client::{AssetMetadata, LedgerClient, NodeStatus, PendingTransaction, SuggestedParams};
pub use dex::{DexConfig, DexQuoter, HttpDexQuoter, SwapQuote, SwapRequest};
pub use media::MediaStore;
pub use memory::InMemoryLedger;
