//! Signature collection.

use algointent_core::{
    Authorization, IntentError, Result, SignedGroup, SignedTransaction, TransactionPlan,
};
use algointent_signer::{requests_for, SignResponse, SigningDelegate};
use tracing::{debug, warn};

/// Collect a signed set for `plan`, in plan order.
///
/// Any decline of a position that needs a signature aborts the whole
/// plan; nothing partial is returned.
pub async fn collect_signatures(
    plan: &TransactionPlan,
    delegate: &dyn SigningDelegate,
) -> Result<SignedGroup> {
    let requests = requests_for(plan)?;
    let responses = delegate.sign(&requests).await?;
    if responses.len() != requests.len() {
        return Err(IntentError::SigningFailed(format!(
            "delegate answered {} of {} positions",
            responses.len(),
            requests.len()
        )));
    }

    let mut signed = Vec::with_capacity(requests.len());
    for ((request, response), descriptor) in requests
        .iter()
        .zip(responses)
        .zip(plan.descriptors())
    {
        if let Authorization::PreSigned(bytes) = &descriptor.authorization {
            signed.push(SignedTransaction::from_bytes(request.position, bytes.clone())?);
            continue;
        }

        let blob = match response {
            SignResponse::Signed { blob } => blob,
            SignResponse::NotMine => {
                warn!("No signature for required position {}", request.position);
                return Err(IntentError::SigningDeclined {
                    position: request.position,
                    reason: "no delegate signed this transaction".to_string(),
                });
            }
            SignResponse::Declined { reason } => {
                warn!("Position {} declined: {}", request.position, reason);
                return Err(IntentError::SigningDeclined {
                    position: request.position,
                    reason,
                });
            }
        };

        let transaction = SignedTransaction::from_bytes(request.position, blob)?;
        if transaction.txid != request.txid {
            return Err(IntentError::SigningFailed(format!(
                "signed bytes at position {} are for {}, expected {}",
                request.position, transaction.txid, request.txid
            )));
        }
        signed.push(transaction);
    }

    let group = SignedGroup::new(signed);
    group.verify_against(plan)?;
    debug!("Collected {} signatures for plan {}", group.len(), plan.id);
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use algointent_core::{
        compute_group_id, encode_signed, Address, OperationKind, PlanOrigin,
        TransactionDescriptor, TransactionKind,
    };
    use algointent_signer::{KeypairDelegate, RelayedDelegate};

    fn payment(sender: Address, to: u8) -> TransactionDescriptor {
        TransactionDescriptor {
            sender,
            fee: 1_000,
            first_valid: 1_000,
            last_valid: 2_000,
            genesis_id: "testnet-v1.0".to_string(),
            genesis_hash: String::new(),
            note: None,
            group: None,
            kind: TransactionKind::Payment {
                receiver: Address::from_public_key([to; 32]),
                amount: 1,
                close_remainder_to: None,
            },
            authorization: Authorization::Holder,
        }
    }

    fn grouped(descriptors: Vec<TransactionDescriptor>) -> TransactionPlan {
        let mut plan = TransactionPlan::new(OperationKind::TransferMulti, PlanOrigin::Engine);
        for d in descriptors {
            plan.push(d).unwrap();
        }
        let group = compute_group_id(plan.descriptors()).unwrap();
        plan.assign_group(group).unwrap();
        plan
    }

    #[tokio::test]
    async fn test_collects_in_order() {
        let keypair = KeypairDelegate::from_seed([8; 32]);
        let plan = grouped(vec![
            payment(keypair.address(), 2),
            payment(keypair.address(), 3),
        ]);
        let group = collect_signatures(&plan, &keypair).await.unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(group.transactions()[1].position, 1);
    }

    #[tokio::test]
    async fn test_not_mine_on_required_position_declines() {
        let keypair = KeypairDelegate::from_seed([8; 32]);
        let stranger = Address::from_public_key([99; 32]);
        let plan = grouped(vec![payment(keypair.address(), 2), payment(stranger, 3)]);
        let err = collect_signatures(&plan, &keypair).await.unwrap_err();
        assert!(matches!(err, IntentError::SigningDeclined { position: 1, .. }));
    }

    #[tokio::test]
    async fn test_wrong_bytes_detected() {
        let sender = Address::from_public_key([8; 32]);
        let plan = grouped(vec![payment(sender, 2), payment(sender, 3)]);
        let other = plan.descriptors()[1].encode().unwrap();
        let blob = encode_signed(&other, &[0; 64]).unwrap();
        let relayed = RelayedDelegate::new(vec![
            SignResponse::signed(blob.clone()),
            SignResponse::signed(blob),
        ]);
        let err = collect_signatures(&plan, &relayed).await.unwrap_err();
        assert!(matches!(err, IntentError::SigningFailed(_)));
    }

    #[tokio::test]
    async fn test_presigned_passes_through() {
        let keypair = KeypairDelegate::from_seed([8; 32]);
        let pool = Address::from_public_key([50; 32]);
        let mut descriptors = vec![payment(keypair.address(), 2), payment(pool, 3)];
        let group = compute_group_id(&descriptors).unwrap();
        for d in &mut descriptors {
            d.group = Some(group);
        }
        let presigned = encode_signed(&descriptors[1].encode().unwrap(), &[5; 64]).unwrap();
        descriptors[1].authorization = Authorization::PreSigned(presigned.clone());

        let mut plan = TransactionPlan::new(
            OperationKind::Swap,
            PlanOrigin::External {
                provider: "dex".to_string(),
            },
        );
        for d in descriptors {
            plan.push(d).unwrap();
        }
        plan.adopt_group().unwrap();

        let signed = collect_signatures(&plan, &keypair).await.unwrap();
        assert_eq!(signed.transactions()[1].bytes, presigned);
    }
}
