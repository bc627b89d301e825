//! Error types for intent orchestration.

use thiserror::Error;

use crate::types::{ErrorKind, Network};

/// Main error type for every pipeline stage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntentError {
    /// An address-shaped field failed to decode or checksum.
    #[error("Invalid address for {field}: '{value}'")]
    InvalidAddress { field: String, value: String },

    /// An amount was missing, non-positive or out of range.
    #[error("Invalid amount for {field}: {message}")]
    InvalidAmount { field: String, message: String },

    /// A required parameter was absent.
    #[error("Missing required parameter: {field}")]
    MissingField { field: String },

    /// A parameter had the wrong shape or an unusable value.
    #[error("Invalid parameter {field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("Multi-recipient transfer requires at least {min} recipients, got {found}")]
    TooFewRecipients { min: usize, found: usize },

    #[error("Atomic group limited to {max} transactions, got {found}")]
    GroupTooLarge { max: usize, found: usize },

    /// The intent named an operation the engine does not plan.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Symbol could not be mapped to an asset on the active network.
    #[error("Unknown asset '{symbol}' on {network}")]
    UnknownAsset { symbol: String, network: Network },

    /// Opting out would burn a non-zero holding.
    #[error("Cannot opt out of asset {asset_id}: holding balance is {balance}")]
    NonZeroBalance { asset_id: u64, balance: u64 },

    /// Resource not found on the node.
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    /// Transport or node failure while fetching data.
    #[error("Ledger request failed: {message}")]
    Network { message: String },

    /// The DEX-quote collaborator failed or returned nothing usable.
    #[error("Swap quote failed: {0}")]
    QuoteFailed(String),

    /// A delegate declined a transaction that requires its signature.
    #[error("Signing declined for transaction at position {position}: {reason}")]
    SigningDeclined { position: usize, reason: String },

    /// The delegate broke its contract (wrong response count, bad bytes).
    #[error("Signing delegate failed: {0}")]
    SigningFailed(String),

    /// The group digest does not match the descriptors it claims to cover.
    #[error("Group digest mismatch: expected {expected}, computed {computed}")]
    GroupMismatch { expected: String, computed: String },

    /// The node rejected the submission. Message is passed through verbatim.
    #[error("Submission rejected by node: {message}")]
    SubmissionRejected { message: String },

    /// The node already holds this transaction.
    #[error("Transaction already submitted: {message}")]
    AlreadySubmitted { message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntentError {
    /// Classify this error into the reported taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            IntentError::InvalidAddress { .. }
            | IntentError::InvalidAmount { .. }
            | IntentError::MissingField { .. }
            | IntentError::InvalidField { .. }
            | IntentError::TooFewRecipients { .. }
            | IntentError::GroupTooLarge { .. }
            | IntentError::UnsupportedOperation(_)
            | IntentError::NonZeroBalance { .. } => ErrorKind::Validation,
            IntentError::UnknownAsset { .. } | IntentError::NotFound { .. } => {
                ErrorKind::Resolution
            }
            IntentError::Network { .. }
            | IntentError::QuoteFailed(_)
            | IntentError::GroupMismatch { .. } => ErrorKind::Build,
            IntentError::SigningDeclined { .. } | IntentError::SigningFailed(_) => {
                ErrorKind::SigningDeclined
            }
            IntentError::SubmissionRejected { .. } => ErrorKind::SubmissionRejected,
            IntentError::AlreadySubmitted { .. } => ErrorKind::AlreadySubmitted,
            IntentError::SerializationError(_)
            | IntentError::Config(_)
            | IntentError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if this error is recoverable by caller correction or retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::Resolution | ErrorKind::Build
        )
    }

    /// Returns true if simply rebuilding and retrying may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Build
    }

    pub(crate) fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        IntentError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_amount(field: impl Into<String>, message: impl Into<String>) -> Self {
        IntentError::InvalidAmount {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Convenience Result type for orchestration operations.
pub type Result<T> = std::result::Result<T, IntentError>;

impl From<serde_json::Error> for IntentError {
    fn from(err: serde_json::Error) -> Self {
        IntentError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = IntentError::TooFewRecipients { min: 2, found: 1 };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.is_recoverable());
        assert!(!err.is_retryable());

        let err = IntentError::Network {
            message: "connection reset".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Build);
        assert!(err.is_retryable());

        let err = IntentError::SigningDeclined {
            position: 1,
            reason: "user said no".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::SigningDeclined);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_node_message_preserved() {
        let err = IntentError::SubmissionRejected {
            message: "overspend (account X, data {...})".to_string(),
        };
        assert!(err.to_string().contains("overspend (account X, data {...})"));
    }
}
