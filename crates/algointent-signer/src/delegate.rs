//! The signing capability consumed by the engine.

use algointent_core::{
    Address, Result, TransactionDescriptor, TransactionKind, TransactionPlan,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One position of a plan, as offered to a delegate.
#[derive(Debug, Clone, PartialEq)]
pub struct SignRequest {
    pub position: usize,
    pub txid: String,
    /// Account whose signature the transaction needs.
    pub signer: Address,
    /// Canonical descriptor bytes.
    pub unsigned: Vec<u8>,
    /// False for positions that pass through pre-signed.
    pub requires_signature: bool,
    /// Human-readable description for approval prompts.
    pub summary: String,
}

/// A delegate's answer for one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignResponse {
    Signed {
        #[serde(with = "algointent_core::encoding::base64_bytes")]
        blob: Vec<u8>,
    },
    NotMine,
    Declined { reason: String },
}

impl SignResponse {
    pub fn signed(blob: Vec<u8>) -> Self {
        SignResponse::Signed { blob }
    }

    pub fn declined(reason: impl Into<String>) -> Self {
        SignResponse::Declined {
            reason: reason.into(),
        }
    }
}

/// Trait for signing delegates.
///
/// Requests arrive in plan order and the response list must match it
/// position for position.
#[async_trait]
pub trait SigningDelegate: Send + Sync {
    async fn sign(&self, requests: &[SignRequest]) -> Result<Vec<SignResponse>>;
}

/// Sign requests for every descriptor of a grouped plan, in order.
pub fn requests_for(plan: &TransactionPlan) -> Result<Vec<SignRequest>> {
    plan.descriptors()
        .iter()
        .enumerate()
        .map(|(position, descriptor)| {
            Ok(SignRequest {
                position,
                txid: descriptor.txid()?,
                signer: descriptor.sender,
                unsigned: descriptor.encode()?,
                requires_signature: descriptor.authorization.requires_signature(),
                summary: describe(descriptor),
            })
        })
        .collect()
}

/// One-line description of what a descriptor does.
pub fn describe(descriptor: &TransactionDescriptor) -> String {
    let action = match &descriptor.kind {
        TransactionKind::Payment {
            receiver,
            amount,
            close_remainder_to,
        } => match close_remainder_to {
            Some(close) => format!(
                "pay {} microalgos to {} and close to {}",
                amount,
                receiver.short(),
                close.short()
            ),
            None => format!("pay {} microalgos to {}", amount, receiver.short()),
        },
        TransactionKind::AssetTransfer {
            asset_id,
            receiver,
            amount,
            close_to,
        } => {
            if let Some(close) = close_to {
                format!("opt out of asset {} (close to {})", asset_id, close.short())
            } else if *receiver == descriptor.sender && *amount == 0 {
                format!("opt in to asset {}", asset_id)
            } else {
                format!(
                    "send {} of asset {} to {}",
                    amount,
                    asset_id,
                    receiver.short()
                )
            }
        }
        TransactionKind::AssetCreate { params } => format!(
            "create asset '{}' ({}), total {}",
            params.asset_name, params.unit_name, params.total
        ),
        TransactionKind::ApplicationCall { app_id, .. } => {
            format!("call application {}", app_id)
        }
    };
    format!(
        "{} from {} (fee {})",
        action,
        descriptor.sender.short(),
        descriptor.fee
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use algointent_core::{compute_group_id, Authorization, OperationKind, PlanOrigin};

    pub(crate) fn payment(from: [u8; 32], to: u8) -> TransactionDescriptor {
        TransactionDescriptor {
            sender: Address::from_public_key(from),
            fee: 1_000,
            first_valid: 1_000,
            last_valid: 2_000,
            genesis_id: "testnet-v1.0".to_string(),
            genesis_hash: String::new(),
            note: None,
            group: None,
            kind: TransactionKind::Payment {
                receiver: Address::from_public_key([to; 32]),
                amount: 2_000_000,
                close_remainder_to: None,
            },
            authorization: Authorization::Holder,
        }
    }

    pub(crate) fn plan_of(descriptors: Vec<TransactionDescriptor>) -> TransactionPlan {
        let mut plan = TransactionPlan::new(OperationKind::TransferMulti, PlanOrigin::Engine);
        for d in descriptors {
            plan.push(d).unwrap();
        }
        if plan.len() > 1 {
            let group = compute_group_id(plan.descriptors()).unwrap();
            plan.assign_group(group).unwrap();
        }
        plan
    }

    #[test]
    fn test_requests_follow_plan_order() {
        let mut presigned = payment([1; 32], 4);
        presigned.authorization = Authorization::PreSigned(vec![7]);
        let plan = plan_of(vec![payment([1; 32], 2), payment([1; 32], 3), presigned]);

        let requests = requests_for(&plan).unwrap();
        assert_eq!(requests.len(), 3);
        let txids = plan.transaction_ids().unwrap();
        for (i, request) in requests.iter().enumerate() {
            assert_eq!(request.position, i);
            assert_eq!(request.txid, txids[i]);
        }
        assert!(requests[0].requires_signature);
        assert!(!requests[2].requires_signature);
    }

    #[test]
    fn test_sign_response_wire_shape() {
        let json = serde_json::to_value(SignResponse::signed(vec![1, 2, 3])).unwrap();
        assert_eq!(json, serde_json::json!({"type": "signed", "blob": "AQID"}));

        let parsed: SignResponse =
            serde_json::from_value(serde_json::json!({"type": "not_mine"})).unwrap();
        assert_eq!(parsed, SignResponse::NotMine);
    }

    #[test]
    fn test_describe_opt_in() {
        let mut descriptor = payment([1; 32], 2);
        descriptor.kind = TransactionKind::AssetTransfer {
            asset_id: 77,
            receiver: descriptor.sender,
            amount: 0,
            close_to: None,
        };
        assert!(describe(&descriptor).starts_with("opt in to asset 77"));
    }
}
