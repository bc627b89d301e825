//! Signed transactions and the wire envelope that carries them.

use serde::{Deserialize, Serialize};

use crate::error::{IntentError, Result};
use crate::plan::{compute_group_id, txid_of, TransactionDescriptor, TransactionPlan};

/// Wire envelope for a signed transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SignedEnvelope {
    #[serde(with = "crate::encoding::base64_bytes")]
    sig: Vec<u8>,
    #[serde(with = "crate::encoding::base64_bytes")]
    txn: Vec<u8>,
}

/// Wrap canonical descriptor bytes and a signature into envelope bytes.
pub fn encode_signed(unsigned: &[u8], signature: &[u8]) -> Result<Vec<u8>> {
    let envelope = SignedEnvelope {
        sig: signature.to_vec(),
        txn: unsigned.to_vec(),
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Signed bytes for the descriptor at `position` of a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTransaction {
    pub position: usize,
    /// Id of the transaction the signature covers.
    pub txid: String,
    pub descriptor: TransactionDescriptor,
    pub signature: Vec<u8>,
    pub bytes: Vec<u8>,
}

impl SignedTransaction {
    /// Decode envelope bytes, recovering the descriptor and its id.
    pub fn from_bytes(position: usize, bytes: Vec<u8>) -> Result<Self> {
        let envelope: SignedEnvelope = serde_json::from_slice(&bytes).map_err(|e| {
            IntentError::SigningFailed(format!(
                "position {} returned an unreadable signed transaction: {}",
                position, e
            ))
        })?;
        let descriptor = TransactionDescriptor::decode(&envelope.txn)?;
        Ok(Self {
            position,
            txid: txid_of(&envelope.txn),
            descriptor,
            signature: envelope.sig,
            bytes,
        })
    }
}

/// The full signed set for one plan, in submission order.
#[derive(Debug, Clone)]
pub struct SignedGroup {
    transactions: Vec<SignedTransaction>,
}

impl SignedGroup {
    pub fn new(transactions: Vec<SignedTransaction>) -> Self {
        Self { transactions }
    }

    pub fn transactions(&self) -> &[SignedTransaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Id of the first transaction, used to track the group.
    pub fn primary_txid(&self) -> Option<&str> {
        self.transactions.first().map(|t| t.txid.as_str())
    }

    pub fn raw(&self) -> Vec<Vec<u8>> {
        self.transactions.iter().map(|t| t.bytes.clone()).collect()
    }

    /// Check that this signed set is exactly `plan`, in plan order.
    ///
    /// The group digest is recomputed from the signed descriptors as they
    /// stand, so any reordering surfaces as [`IntentError::GroupMismatch`].
    pub fn verify_against(&self, plan: &TransactionPlan) -> Result<()> {
        if self.transactions.len() != plan.len() {
            return Err(IntentError::Internal(format!(
                "signed set has {} transactions, plan has {}",
                self.transactions.len(),
                plan.len()
            )));
        }

        if let Some(group) = plan.group() {
            let signed: Vec<TransactionDescriptor> = self
                .transactions
                .iter()
                .map(|t| t.descriptor.clone())
                .collect();
            let computed = compute_group_id(&signed)?;
            if &computed != group || signed.iter().any(|d| d.group.as_ref() != Some(group)) {
                return Err(IntentError::GroupMismatch {
                    expected: group.to_string(),
                    computed: computed.to_string(),
                });
            }
        }

        let expected = plan.transaction_ids()?;
        for (index, (signed, txid)) in self.transactions.iter().zip(expected.iter()).enumerate() {
            if signed.position != index || &signed.txid != txid {
                return Err(IntentError::Internal(format!(
                    "signed transaction at position {} does not match the plan",
                    index
                )));
            }
        }
        Ok(())
    }
}
