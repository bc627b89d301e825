//! Common types shared across the pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ledger network an engine instance is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    MainNet,
    #[default]
    TestNet,
    BetaNet,
    LocalNet,
}

impl Network {
    /// Genesis identifier the node reports for this network.
    pub fn genesis_id(&self) -> &'static str {
        match self {
            Network::MainNet => "mainnet-v1.0",
            Network::TestNet => "testnet-v1.0",
            Network::BetaNet => "betanet-v1.0",
            Network::LocalNet => "sandnet-v1",
        }
    }

    /// Parse a network name as used in config files and env vars.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Some(Network::MainNet),
            "testnet" | "test" => Some(Network::TestNet),
            "betanet" | "beta" => Some(Network::BetaNet),
            "localnet" | "local" | "sandnet" => Some(Network::LocalNet),
            _ => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::MainNet => "mainnet",
            Network::TestNet => "testnet",
            Network::BetaNet => "betanet",
            Network::LocalNet => "localnet",
        };
        f.write_str(name)
    }
}

/// The closed set of operations the engine knows how to plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    TransferSingle,
    TransferMulti,
    AssetCreate,
    AssetTransfer,
    AssetOptIn,
    AssetOptOut,
    Swap,
}

impl OperationKind {
    /// Returns true if a successful run of this operation creates a ledger resource.
    pub fn creates_resource(&self) -> bool {
        matches!(self, OperationKind::AssetCreate)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::TransferSingle => "transfer_single",
            OperationKind::TransferMulti => "transfer_multi",
            OperationKind::AssetCreate => "asset_create",
            OperationKind::AssetTransfer => "asset_transfer",
            OperationKind::AssetOptIn => "asset_opt_in",
            OperationKind::AssetOptOut => "asset_opt_out",
            OperationKind::Swap => "swap",
        };
        f.write_str(name)
    }
}

/// Error classification reported on failed results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad intent shape or values. Never touches the network.
    Validation,
    /// Unknown asset symbol or id.
    Resolution,
    /// Network fetch failure while building a plan. Retryable.
    Build,
    /// The signing delegate refused a required transaction.
    SigningDeclined,
    /// The node rejected the group.
    SubmissionRejected,
    /// Confirmation not observed within the poll bound.
    Timeout,
    /// A chained follow-up plan failed.
    ChainedActionFailed,
    /// The group was already accepted by the node.
    AlreadySubmitted,
    Internal,
}

impl ErrorKind {
    /// Returns true if the caller can fix the problem by changing the intent.
    pub fn is_caller_correctable(&self) -> bool {
        matches!(self, ErrorKind::Validation | ErrorKind::Resolution)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Resolution => "resolution",
            ErrorKind::Build => "build",
            ErrorKind::SigningDeclined => "signing_declined",
            ErrorKind::SubmissionRejected => "submission_rejected",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ChainedActionFailed => "chained_action_failed",
            ErrorKind::AlreadySubmitted => "already_submitted",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parse() {
        assert_eq!(Network::parse("MainNet"), Some(Network::MainNet));
        assert_eq!(Network::parse(" testnet "), Some(Network::TestNet));
        assert_eq!(Network::parse("sandnet"), Some(Network::LocalNet));
        assert_eq!(Network::parse("moonnet"), None);
    }

    #[test]
    fn test_network_serde_roundtrip_name() {
        let json = serde_json::to_string(&Network::MainNet).unwrap();
        assert_eq!(json, "\"mainnet\"");
        assert_eq!(Network::MainNet.to_string(), "mainnet");
    }

    #[test]
    fn test_error_kind_correctable() {
        assert!(ErrorKind::Validation.is_caller_correctable());
        assert!(ErrorKind::Resolution.is_caller_correctable());
        assert!(!ErrorKind::Timeout.is_caller_correctable());
    }
}
