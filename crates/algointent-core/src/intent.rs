//! Intent types and builder.
//!
//! An [`Intent`] is the loosely-typed request produced by an external
//! collaborator. [`NormalizedOperation`] is its validated, closed form; see
//! [`crate::normalize`] for the conversion.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::address::Address;
use crate::error::{IntentError, Result};
use crate::types::OperationKind;

/// Symbol of the ledger's native unit.
pub const NATIVE_SYMBOL: &str = "ALGO";

/// A structured request to perform one ledger operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Operation name (e.g. "send_algo", "create_nft").
    #[serde(alias = "intent")]
    pub operation: String,

    /// The account acting on the ledger.
    #[serde(default)]
    pub sender: String,

    /// Operation parameters as supplied.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl Intent {
    /// Create a new IntentBuilder.
    pub fn builder() -> IntentBuilder {
        IntentBuilder::new()
    }

    /// Look up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }
}

/// Builder for creating Intents with a fluent API.
#[derive(Debug, Default)]
pub struct IntentBuilder {
    operation: Option<String>,
    sender: Option<String>,
    parameters: Map<String, Value>,
}

impl IntentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn sender(mut self, sender: impl ToString) -> Self {
        self.sender = Some(sender.to_string());
        self
    }

    /// Set a parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Build the Intent. Only the operation name is required here; everything
    /// else is checked by the normalizer.
    pub fn build(self) -> Result<Intent> {
        let operation = self.operation.ok_or_else(|| IntentError::MissingField {
            field: "operation".to_string(),
        })?;

        Ok(Intent {
            operation,
            sender: self.sender.unwrap_or_default(),
            parameters: self.parameters,
        })
    }
}

/// One recipient and the amount they receive, in whole units of the asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub receiver: Address,
    pub amount: f64,
}

/// Single-recipient transfer of the native unit or a named asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub sender: Address,
    /// Canonical asset symbol or numeric id.
    pub asset: String,
    pub payout: Payout,
}

/// Atomic transfer to several recipients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiTransfer {
    pub sender: Address,
    pub asset: String,
    pub payouts: Vec<Payout>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetCreate {
    pub creator: Address,
    pub name: String,
    pub unit_name: String,
    pub total: u64,
    pub decimals: u32,
    pub default_frozen: bool,
    /// Metadata locator embedded verbatim.
    pub url: Option<String>,
    /// Free-form description carried as the transaction note.
    pub description: Option<String>,
    pub manager: Option<Address>,
    pub reserve: Option<Address>,
    pub freeze: Option<Address>,
    pub clawback: Option<Address>,
}

/// Transfer of an existing asset to one or more recipients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetTransfer {
    pub sender: Address,
    pub asset_id: u64,
    pub payouts: Vec<Payout>,
}

/// Account-side registration for an asset (opt-in or opt-out).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetHolding {
    pub account: Address,
    pub asset_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapOrder {
    pub sender: Address,
    pub from_asset: String,
    pub to_asset: String,
    pub amount: f64,
    /// Accepted slippage as a fraction (0.005 = 0.5%).
    pub slippage: f64,
}

/// Validated, strongly-typed form of an [`Intent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum NormalizedOperation {
    TransferSingle(Transfer),
    TransferMulti(MultiTransfer),
    AssetCreate(AssetCreate),
    AssetTransfer(AssetTransfer),
    AssetOptIn(AssetHolding),
    AssetOptOut(AssetHolding),
    Swap(SwapOrder),
}

impl NormalizedOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            NormalizedOperation::TransferSingle(_) => OperationKind::TransferSingle,
            NormalizedOperation::TransferMulti(_) => OperationKind::TransferMulti,
            NormalizedOperation::AssetCreate(_) => OperationKind::AssetCreate,
            NormalizedOperation::AssetTransfer(_) => OperationKind::AssetTransfer,
            NormalizedOperation::AssetOptIn(_) => OperationKind::AssetOptIn,
            NormalizedOperation::AssetOptOut(_) => OperationKind::AssetOptOut,
            NormalizedOperation::Swap(_) => OperationKind::Swap,
        }
    }

    /// The account that signs for this operation.
    pub fn sender(&self) -> &Address {
        match self {
            NormalizedOperation::TransferSingle(t) => &t.sender,
            NormalizedOperation::TransferMulti(m) => &m.sender,
            NormalizedOperation::AssetCreate(c) => &c.creator,
            NormalizedOperation::AssetTransfer(t) => &t.sender,
            NormalizedOperation::AssetOptIn(h) | NormalizedOperation::AssetOptOut(h) => {
                &h.account
            }
            NormalizedOperation::Swap(s) => &s.sender,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_intent_builder() {
        let intent = Intent::builder()
            .operation("send_algo")
            .sender("SENDER")
            .param("amount", 5)
            .param("recipient", "RECIPIENT")
            .build()
            .unwrap();

        assert_eq!(intent.operation, "send_algo");
        assert_eq!(intent.sender, "SENDER");
        assert_eq!(intent.param("amount"), Some(&json!(5)));
    }

    #[test]
    fn test_intent_builder_missing_operation() {
        let result = Intent::builder().param("amount", 1).build();
        assert!(matches!(result, Err(IntentError::MissingField { .. })));
    }

    #[test]
    fn test_intent_accepts_intent_key() {
        let intent: Intent = serde_json::from_value(json!({
            "intent": "opt_in",
            "parameters": { "asset_id": 42 }
        }))
        .unwrap();
        assert_eq!(intent.operation, "opt_in");
        assert!(intent.sender.is_empty());
    }

    #[test]
    fn test_normalized_operation_tagging() {
        let account = Address::from_public_key([1u8; 32]);
        let op = NormalizedOperation::AssetOptIn(AssetHolding {
            account,
            asset_id: 7,
        });
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["operation"], "asset_opt_in");
        assert_eq!(value["asset_id"], 7);
        assert_eq!(op.kind(), OperationKind::AssetOptIn);
        assert_eq!(op.sender(), &account);
    }
}
