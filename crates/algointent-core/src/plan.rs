//! Transaction descriptors and plans.
//!
//! A [`TransactionPlan`] is the ordered, unsigned output of the plan builder.
//! Multi-descriptor plans carry a [`GroupId`] computed over the final
//! descriptor set; see [`compute_group_id`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};
use uuid::Uuid;

use crate::address::Address;
use crate::encoding::{self, base32};
use crate::error::{IntentError, Result};
use crate::types::OperationKind;

/// Domain separator for transaction ids and signatures.
pub const TX_PREFIX: &[u8] = b"TX";
/// Domain separator for group digests.
pub const GROUP_PREFIX: &[u8] = b"TG";

/// Parameters of a newly created asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetParams {
    pub total: u64,
    pub decimals: u32,
    pub default_frozen: bool,
    pub unit_name: String,
    pub asset_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserve: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freeze: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clawback: Option<Address>,
}

/// Kind-specific fields of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionKind {
    /// Native-unit payment, amount in base units.
    Payment {
        receiver: Address,
        amount: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        close_remainder_to: Option<Address>,
    },

    /// Asset transfer. A zero-amount self-transfer is an opt-in; a transfer
    /// with `close_to` removes the holding.
    AssetTransfer {
        asset_id: u64,
        receiver: Address,
        amount: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        close_to: Option<Address>,
    },

    AssetCreate { params: AssetParams },

    /// Application call, used by DEX routers.
    ApplicationCall {
        app_id: u64,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        foreign_assets: Vec<u64>,
    },
}

impl TransactionKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            TransactionKind::Payment { .. } => "payment",
            TransactionKind::AssetTransfer { .. } => "asset_transfer",
            TransactionKind::AssetCreate { .. } => "asset_create",
            TransactionKind::ApplicationCall { .. } => "application_call",
        }
    }
}

/// Who provides the signature for a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Authorization {
    /// The signing delegate must sign.
    #[default]
    Holder,
    /// Signed elsewhere; the bytes pass through unchanged.
    PreSigned(Vec<u8>),
}

impl Authorization {
    pub fn requires_signature(&self) -> bool {
        matches!(self, Authorization::Holder)
    }
}

/// One unsigned transaction, ready for signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDescriptor {
    pub sender: Address,
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::encoding::base64_opt"
    )]
    pub note: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
    pub kind: TransactionKind,
    #[serde(skip)]
    pub authorization: Authorization,
}

impl TransactionDescriptor {
    /// Canonical byte encoding. This is what gets signed and hashed.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// `TX` ‖ canonical bytes.
    pub fn bytes_to_sign(&self) -> Result<Vec<u8>> {
        Ok(prefixed(TX_PREFIX, &self.encode()?))
    }

    pub fn raw_txid(&self) -> Result<[u8; 32]> {
        Ok(raw_txid_of(&self.encode()?))
    }

    /// Transaction id: base32 of SHA-512/256 over the bytes to sign.
    pub fn txid(&self) -> Result<String> {
        Ok(base32::encode(&self.raw_txid()?))
    }

    pub fn creates_asset(&self) -> bool {
        matches!(self.kind, TransactionKind::AssetCreate { .. })
    }

    /// Returns true if `round` is inside the validity window.
    pub fn is_valid_at(&self, round: u64) -> bool {
        round >= self.first_valid && round <= self.last_valid
    }
}

/// Raw transaction id for already-encoded descriptor bytes.
pub fn raw_txid_of(encoded: &[u8]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    hasher.update(TX_PREFIX);
    hasher.update(encoded);
    digest_bytes(hasher)
}

fn digest_bytes(hasher: Sha512_256) -> [u8; 32] {
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Textual transaction id for already-encoded descriptor bytes.
pub fn txid_of(encoded: &[u8]) -> String {
    base32::encode(&raw_txid_of(encoded))
}

fn prefixed(prefix: &[u8], bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefix.len() + bytes.len());
    out.extend_from_slice(prefix);
    out.extend_from_slice(bytes);
    out
}

/// Digest binding an ordered set of transactions into one atomic group.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupId([u8; 32]);

impl GroupId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encoding::encode_base64(self.0))
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self)
    }
}

impl TryFrom<String> for GroupId {
    type Error = IntentError;

    fn try_from(value: String) -> Result<Self> {
        let bytes = encoding::decode_base64(&value)
            .filter(|b| b.len() == 32)
            .ok_or_else(|| IntentError::SerializationError(format!("bad group id '{}'", value)))?;
        let mut id = [0u8; 32];
        id.copy_from_slice(&bytes);
        Ok(GroupId(id))
    }
}

impl From<GroupId> for String {
    fn from(id: GroupId) -> Self {
        id.to_string()
    }
}

/// Group digest: SHA-512/256 over `TG` followed by each member's raw
/// transaction id, in order, computed with the group field cleared.
pub fn compute_group_id(descriptors: &[TransactionDescriptor]) -> Result<GroupId> {
    let mut hasher = Sha512_256::new();
    hasher.update(GROUP_PREFIX);
    for descriptor in descriptors {
        let mut ungrouped = descriptor.clone();
        ungrouped.group = None;
        hasher.update(ungrouped.raw_txid()?);
    }
    Ok(GroupId(digest_bytes(hasher)))
}

/// Who produced the descriptors of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanOrigin {
    /// Built by the engine from fresh node parameters.
    Engine,
    /// Supplied ready-to-sign by a collaborator (e.g. a DEX router).
    External { provider: String },
}

/// Ordered set of descriptors representing one logical operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPlan {
    pub id: Uuid,
    pub operation: OperationKind,
    pub origin: PlanOrigin,
    descriptors: Vec<TransactionDescriptor>,
    group: Option<GroupId>,
    pub created_at: DateTime<Utc>,
    /// Free-form details such as a swap quote.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl TransactionPlan {
    pub fn new(operation: OperationKind, origin: PlanOrigin) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation,
            origin,
            descriptors: Vec::new(),
            group: None,
            created_at: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }

    /// Append a descriptor. Refused once the plan has been grouped.
    pub fn push(&mut self, descriptor: TransactionDescriptor) -> Result<()> {
        if self.group.is_some() {
            return Err(IntentError::Internal(
                "cannot modify a grouped plan; rebuild it instead".to_string(),
            ));
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    pub fn descriptors(&self) -> &[TransactionDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn group(&self) -> Option<&GroupId> {
        self.group.as_ref()
    }

    pub fn is_grouped(&self) -> bool {
        self.group.is_some()
    }

    /// Stamp every descriptor with `group`. This is the final mutation a
    /// plan receives.
    pub fn assign_group(&mut self, group: GroupId) -> Result<()> {
        if self.group.is_some() {
            return Err(IntentError::Internal("plan is already grouped".to_string()));
        }
        let computed = compute_group_id(&self.descriptors)?;
        if computed != group {
            return Err(IntentError::GroupMismatch {
                expected: group.to_string(),
                computed: computed.to_string(),
            });
        }
        for descriptor in &mut self.descriptors {
            descriptor.group = Some(group);
        }
        self.group = Some(group);
        Ok(())
    }

    /// Record a group that the descriptors already carry, after checking it.
    pub fn adopt_group(&mut self) -> Result<GroupId> {
        let stamped = self
            .descriptors
            .first()
            .and_then(|d| d.group)
            .ok_or_else(|| IntentError::Internal("descriptors carry no group".to_string()))?;

        if self.descriptors.iter().any(|d| d.group != Some(stamped)) {
            return Err(IntentError::GroupMismatch {
                expected: stamped.to_string(),
                computed: "inconsistent group stamps".to_string(),
            });
        }
        let computed = compute_group_id(&self.descriptors)?;
        if computed != stamped {
            return Err(IntentError::GroupMismatch {
                expected: stamped.to_string(),
                computed: computed.to_string(),
            });
        }
        self.group = Some(stamped);
        Ok(stamped)
    }

    /// Recompute the group digest and check every stamp against it.
    pub fn verify_group(&self) -> Result<()> {
        match (self.descriptors.len(), self.group) {
            (0, _) => Err(IntentError::Internal("plan has no descriptors".to_string())),
            (1, None) => Ok(()),
            (_, None) => Err(IntentError::Internal(
                "multi-transaction plan has not been grouped".to_string(),
            )),
            (_, Some(group)) => {
                let computed = compute_group_id(&self.descriptors)?;
                if computed != group || self.descriptors.iter().any(|d| d.group != Some(group)) {
                    return Err(IntentError::GroupMismatch {
                        expected: group.to_string(),
                        computed: computed.to_string(),
                    });
                }
                Ok(())
            }
        }
    }

    pub fn transaction_ids(&self) -> Result<Vec<String>> {
        self.descriptors.iter().map(|d| d.txid()).collect()
    }

    /// Position of the first resource-creating descriptor, if any.
    pub fn creation_position(&self) -> Option<usize> {
        self.descriptors.iter().position(|d| d.creates_asset())
    }

    pub fn total_fee(&self) -> u64 {
        self.descriptors.iter().map(|d| d.fee).sum()
    }

    pub fn has_presigned(&self) -> bool {
        self.descriptors
            .iter()
            .any(|d| !d.authorization.requires_signature())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn payment(from: u8, to: u8, amount: u64) -> TransactionDescriptor {
        TransactionDescriptor {
            sender: Address::from_public_key([from; 32]),
            fee: 1000,
            first_valid: 100,
            last_valid: 1100,
            genesis_id: "testnet-v1.0".to_string(),
            genesis_hash: "SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=".to_string(),
            note: None,
            group: None,
            kind: TransactionKind::Payment {
                receiver: Address::from_public_key([to; 32]),
                amount,
                close_remainder_to: None,
            },
            authorization: Authorization::Holder,
        }
    }

    pub(crate) fn grouped_plan(count: u8) -> TransactionPlan {
        let mut plan = TransactionPlan::new(OperationKind::TransferMulti, PlanOrigin::Engine);
        for i in 0..count {
            plan.push(payment(1, 10 + i, 2_000_000)).unwrap();
        }
        let group = compute_group_id(plan.descriptors()).unwrap();
        plan.assign_group(group).unwrap();
        plan
    }

    #[test]
    fn test_txid_shape_and_determinism() {
        let descriptor = payment(1, 2, 5_000_000);
        let txid = descriptor.txid().unwrap();
        assert_eq!(txid.len(), 52);
        assert_eq!(txid, descriptor.clone().txid().unwrap());
        assert_ne!(txid, payment(1, 2, 5_000_001).txid().unwrap());
    }

    #[test]
    fn test_encode_decode_preserves_txid() {
        let mut descriptor = payment(1, 2, 5);
        descriptor.note = Some(b"hello".to_vec());
        let bytes = descriptor.encode().unwrap();
        let decoded = TransactionDescriptor::decode(&bytes).unwrap();
        assert_eq!(decoded, descriptor);
        assert_eq!(txid_of(&bytes), descriptor.txid().unwrap());
    }

    #[test]
    fn test_group_digest_depends_on_order() {
        let a = payment(1, 2, 1);
        let b = payment(1, 3, 1);
        let forward = compute_group_id(&[a.clone(), b.clone()]).unwrap();
        let reversed = compute_group_id(&[b, a]).unwrap();
        assert_ne!(forward, reversed);
    }

    #[test]
    fn test_group_digest_ignores_existing_stamp() {
        let plan = grouped_plan(3);
        let recomputed = compute_group_id(plan.descriptors()).unwrap();
        assert_eq!(plan.group(), Some(&recomputed));
        assert!(plan.verify_group().is_ok());
    }

    #[test]
    fn test_grouped_plan_is_sealed() {
        let mut plan = grouped_plan(2);
        assert!(plan.push(payment(1, 9, 1)).is_err());
        let group = *plan.group().unwrap();
        assert!(plan.assign_group(group).is_err());
    }

    #[test]
    fn test_verify_detects_tampering() {
        let plan = grouped_plan(2);
        let mut json = serde_json::to_value(&plan).unwrap();
        json["descriptors"][1]["kind"]["amount"] = serde_json::json!(1);
        let tampered: TransactionPlan = serde_json::from_value(json).unwrap();
        assert!(matches!(
            tampered.verify_group(),
            Err(IntentError::GroupMismatch { .. })
        ));
    }

    #[test]
    fn test_adopt_group() {
        let mut source = grouped_plan(2);
        let descriptors = source.descriptors().to_vec();
        let mut plan = TransactionPlan::new(
            OperationKind::Swap,
            PlanOrigin::External {
                provider: "dex".to_string(),
            },
        );
        for d in descriptors {
            plan.push(d).unwrap();
        }
        let adopted = plan.adopt_group().unwrap();
        assert_eq!(Some(&adopted), source.group());
        assert!(source.push(payment(1, 2, 3)).is_err());
    }

    #[test]
    fn test_single_descriptor_needs_no_group() {
        let mut plan = TransactionPlan::new(OperationKind::TransferSingle, PlanOrigin::Engine);
        plan.push(payment(1, 2, 1)).unwrap();
        assert!(plan.verify_group().is_ok());
        assert_eq!(plan.total_fee(), 1000);
    }

    #[test]
    fn test_group_id_serde() {
        let plan = grouped_plan(2);
        let group = *plan.group().unwrap();
        let json = serde_json::to_string(&group).unwrap();
        let back: GroupId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, group);
    }
}
