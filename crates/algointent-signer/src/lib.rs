//! # Algo Intent Signer
//!
//! The engine never holds key material. It hands unsigned bytes to a
//! [`SigningDelegate`] and gets back signed bytes, a "not mine" marker or
//! a decline for each position.

pub mod approval;
pub mod delegate;
pub mod keypair;
pub mod relayed;

pub use approval::{Approval, ApprovalDelegate, ApprovalRequest};
pub use delegate::{describe, requests_for, SignRequest, SignResponse, SigningDelegate};
pub use keypair::KeypairDelegate;
pub use relayed::RelayedDelegate;
