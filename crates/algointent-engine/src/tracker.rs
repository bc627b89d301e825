//! Submission and confirmation tracking.

use std::sync::Arc;

use algointent_core::{ExecutionResult, IntentError, SignedGroup, TransactionPlan};
use algointent_ledger::{LedgerClient, PendingTransaction};
use tracing::{info, warn};

/// What one confirmation check found.
enum Poll {
    Confirmed(PendingTransaction),
    PoolError(String),
    Pending,
}

/// Submits a signed group once and waits a bounded number of rounds for it.
#[derive(Clone)]
pub struct SubmissionTracker {
    ledger: Arc<dyn LedgerClient>,
    max_poll_rounds: u64,
}

impl SubmissionTracker {
    pub fn new(ledger: Arc<dyn LedgerClient>, max_poll_rounds: u64) -> Self {
        Self {
            ledger,
            max_poll_rounds,
        }
    }

    /// Submit `signed` for `plan` and classify the terminal outcome.
    ///
    /// There is no resubmission. Once the node accepts the group the
    /// outcome is either `Success` or `Timeout`.
    pub async fn submit(&self, plan: &TransactionPlan, signed: &SignedGroup) -> ExecutionResult {
        if let Err(e) = signed.verify_against(plan) {
            warn!("Refusing to submit plan {}: {}", plan.id, e);
            return ExecutionResult::rejected(plan, None, &e);
        }
        let Some(txid) = signed.primary_txid() else {
            let e = IntentError::Internal("signed group is empty".to_string());
            return ExecutionResult::rejected(plan, None, &e);
        };

        match self.ledger.submit_group(&signed.raw()).await {
            Ok(_) => {
                info!(
                    "📤 Submitted plan {} ({} transactions) as {}",
                    plan.id,
                    signed.len(),
                    txid
                );
            }
            Err(IntentError::AlreadySubmitted { message }) => {
                info!("Plan {} was already submitted: {}", plan.id, message);
                let confirmed_round = match self.check(txid).await {
                    Poll::Confirmed(pending) => pending.confirmed_round,
                    _ => None,
                };
                return ExecutionResult::already_submitted(plan, txid, confirmed_round, &message);
            }
            Err(IntentError::Network { message }) => {
                warn!("Submission of plan {} failed in transport: {}", plan.id, message);
                let e = IntentError::SubmissionRejected { message };
                return ExecutionResult::rejected(plan, Some(txid), &e);
            }
            Err(e) => {
                warn!("Node rejected plan {}: {}", plan.id, e);
                return ExecutionResult::rejected(plan, Some(txid), &e);
            }
        }

        self.await_confirmation(plan, txid).await
    }

    async fn await_confirmation(&self, plan: &TransactionPlan, txid: &str) -> ExecutionResult {
        let mut round = match self.ledger.status().await {
            Ok(status) => status.last_round,
            Err(e) => {
                warn!("Could not read node status: {}", e);
                0
            }
        };

        for polled in 0..=self.max_poll_rounds {
            match self.check(txid).await {
                Poll::Confirmed(pending) => {
                    let confirmed_round = pending.confirmed_round.unwrap_or(round);
                    let created = plan
                        .creation_position()
                        .and(pending.asset_index);
                    info!("✅ {} confirmed in round {}", txid, confirmed_round);
                    return ExecutionResult::success(plan, txid, confirmed_round, created);
                }
                Poll::PoolError(message) => {
                    warn!("{} left the pool: {}", txid, message);
                    return ExecutionResult::timeout(plan, txid, polled, Some(&message));
                }
                Poll::Pending => {}
            }

            if polled == self.max_poll_rounds {
                break;
            }
            round = match self.ledger.wait_for_round(round).await {
                Ok(status) => status.last_round,
                Err(e) => {
                    warn!("Waiting for round {} failed: {}", round + 1, e);
                    round + 1
                }
            };
        }

        warn!(
            "⏱️ {} not confirmed after {} rounds",
            txid, self.max_poll_rounds
        );
        ExecutionResult::timeout(plan, txid, self.max_poll_rounds, None)
    }

    async fn check(&self, txid: &str) -> Poll {
        match self.ledger.pending_transaction(txid).await {
            Ok(pending) if pending.is_confirmed() => Poll::Confirmed(pending),
            Ok(PendingTransaction {
                pool_error: Some(error),
                ..
            }) => Poll::PoolError(error),
            Ok(_) => Poll::Pending,
            Err(e) => {
                warn!("Poll for {} failed: {}", txid, e);
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use algointent_core::{
        compute_group_id, Address, Authorization, ErrorKind, ExecutionStatus, Network,
        OperationKind, PlanOrigin, SignedTransaction, TransactionDescriptor, TransactionKind,
    };
    use algointent_ledger::InMemoryLedger;
    use algointent_signer::KeypairDelegate;

    use crate::signing::collect_signatures;

    struct Fixture {
        ledger: Arc<InMemoryLedger>,
        tracker: SubmissionTracker,
        keypair: KeypairDelegate,
    }

    async fn fixture() -> Fixture {
        let ledger = Arc::new(InMemoryLedger::new(Network::TestNet));
        let keypair = KeypairDelegate::from_seed([12; 32]);
        ledger.fund(&keypair.address(), 100_000_000).await;
        Fixture {
            tracker: SubmissionTracker::new(ledger.clone(), 4),
            ledger,
            keypair,
        }
    }

    fn plan_for(sender: Address, recipients: &[u8]) -> TransactionPlan {
        let mut plan = TransactionPlan::new(OperationKind::TransferMulti, PlanOrigin::Engine);
        for to in recipients {
            plan.push(TransactionDescriptor {
                sender,
                fee: 1_000,
                first_valid: 1_000,
                last_valid: 2_000,
                genesis_id: "testnet-v1.0".to_string(),
                genesis_hash: String::new(),
                note: None,
                group: None,
                kind: TransactionKind::Payment {
                    receiver: Address::from_public_key([*to; 32]),
                    amount: 2_000_000,
                    close_remainder_to: None,
                },
                authorization: Authorization::Holder,
            })
            .unwrap();
        }
        if plan.len() > 1 {
            let group = compute_group_id(plan.descriptors()).unwrap();
            plan.assign_group(group).unwrap();
        }
        plan
    }

    #[tokio::test]
    async fn test_confirms_within_bound() {
        let f = fixture().await;
        let plan = plan_for(f.keypair.address(), &[2, 3]);
        let signed = collect_signatures(&plan, &f.keypair).await.unwrap();

        let result = f.tracker.submit(&plan, &signed).await;
        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.confirmed_round, Some(1_001));
        assert_eq!(result.group_id, plan.group().map(ToString::to_string));
        assert!(result.created_resource_id.is_none());
    }

    #[tokio::test]
    async fn test_resubmission_is_already_submitted() {
        let f = fixture().await;
        let plan = plan_for(f.keypair.address(), &[2]);
        let signed = collect_signatures(&plan, &f.keypair).await.unwrap();

        let first = f.tracker.submit(&plan, &signed).await;
        assert!(first.is_success());
        let second = f.tracker.submit(&plan, &signed).await;
        assert_eq!(second.status, ExecutionStatus::AlreadySubmitted);
        assert_eq!(second.error_kind, Some(ErrorKind::AlreadySubmitted));
        assert_eq!(second.confirmed_round, first.confirmed_round);
        assert_eq!(f.ledger.submission_count().await, 1);
    }

    #[tokio::test]
    async fn test_reordered_set_never_reaches_node() {
        let f = fixture().await;
        let plan = plan_for(f.keypair.address(), &[2, 3, 4]);
        let signed = collect_signatures(&plan, &f.keypair).await.unwrap();

        let mut reordered: Vec<SignedTransaction> = signed.transactions().to_vec();
        reordered.swap(0, 2);
        let result = f.tracker.submit(&plan, &SignedGroup::new(reordered)).await;
        assert!(result.is_failure());
        assert_eq!(f.ledger.submit_attempts().await, 0);
    }

    #[tokio::test]
    async fn test_rejection_message_preserved() {
        let f = fixture().await;
        let plan = plan_for(f.keypair.address(), &[2]);
        let signed = collect_signatures(&plan, &f.keypair).await.unwrap();
        f.ledger
            .reject_next_submission("TransactionPool.Remember: txn dead: round 5000 outside of 1000--2000")
            .await;

        let result = f.tracker.submit(&plan, &signed).await;
        assert!(result.is_failure());
        assert_eq!(result.error_kind, Some(ErrorKind::SubmissionRejected));
        assert!(result.message.contains("txn dead: round 5000 outside of 1000--2000"));
    }

    #[tokio::test]
    async fn test_unconfirmed_is_timeout() {
        let f = fixture().await;
        f.ledger.set_confirmation_delay(None).await;
        let plan = plan_for(f.keypair.address(), &[2]);
        let signed = collect_signatures(&plan, &f.keypair).await.unwrap();

        let result = f.tracker.submit(&plan, &signed).await;
        assert_eq!(result.status, ExecutionStatus::Timeout);
        assert!(!result.is_failure());
        assert_eq!(result.transaction_id, signed.primary_txid().map(str::to_string));
        assert_eq!(f.ledger.current_round().await, 1_004);
    }

    #[tokio::test]
    async fn test_pool_error_after_acceptance_is_timeout() {
        let f = fixture().await;
        f.ledger.set_confirmation_delay(None).await;
        let plan = plan_for(f.keypair.address(), &[2]);
        let signed = collect_signatures(&plan, &f.keypair).await.unwrap();
        f.ledger
            .set_pool_error(Some("transaction group rejected".to_string()))
            .await;

        let result = f.tracker.submit(&plan, &signed).await;
        assert_eq!(result.status, ExecutionStatus::Timeout);
        assert!(result.message.contains("transaction group rejected"));
    }
}
