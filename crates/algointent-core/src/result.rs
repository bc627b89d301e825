//! Execution results.
//!
//! An [`ExecutionResult`] is the terminal outcome of one plan. It is built
//! once by the tracker (or by the engine on an early failure) and never
//! changed afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::IntentError;
use crate::intent::NormalizedOperation;
use crate::plan::TransactionPlan;
use crate::types::ErrorKind;

/// Terminal status of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Confirmed on the ledger.
    Success,
    /// Rejected before or at submission.
    Failure,
    /// Submitted but not seen confirmed within the poll bound. The
    /// transaction may still land; re-check by id.
    Timeout,
    /// The node already held this group. Not a second success.
    AlreadySubmitted,
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ExecutionStatus::Failure)
    }
}

/// Outcome of executing one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub id: Uuid,
    pub plan_id: Option<Uuid>,
    pub status: ExecutionStatus,
    pub transaction_id: Option<String>,
    pub group_id: Option<String>,
    /// Id of a ledger resource created by the plan (e.g. a new asset).
    pub created_resource_id: Option<u64>,
    pub confirmed_round: Option<u64>,
    pub error_kind: Option<ErrorKind>,
    pub message: String,
    pub completed_at: DateTime<Utc>,
}

impl ExecutionResult {
    fn base(plan_id: Option<Uuid>, status: ExecutionStatus, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            plan_id,
            status,
            transaction_id: None,
            group_id: None,
            created_resource_id: None,
            confirmed_round: None,
            error_kind: None,
            message,
            completed_at: Utc::now(),
        }
    }

    fn for_plan(plan: &TransactionPlan, status: ExecutionStatus, txid: &str, message: String) -> Self {
        let mut result = Self::base(Some(plan.id), status, message);
        result.transaction_id = Some(txid.to_string());
        result.group_id = plan.group().map(ToString::to_string);
        result
    }

    pub fn success(
        plan: &TransactionPlan,
        txid: &str,
        confirmed_round: u64,
        created_resource_id: Option<u64>,
    ) -> Self {
        let message = match created_resource_id {
            Some(id) => format!("Confirmed in round {}; created resource {}", confirmed_round, id),
            None => format!("Confirmed in round {}", confirmed_round),
        };
        let mut result = Self::for_plan(plan, ExecutionStatus::Success, txid, message);
        result.confirmed_round = Some(confirmed_round);
        result.created_resource_id = created_resource_id;
        result
    }

    pub fn timeout(plan: &TransactionPlan, txid: &str, rounds: u64, detail: Option<&str>) -> Self {
        let mut message = format!(
            "Not confirmed after {} rounds; check transaction {} before retrying",
            rounds, txid
        );
        if let Some(detail) = detail {
            message.push_str(&format!(" (node reported: {})", detail));
        }
        let mut result = Self::for_plan(plan, ExecutionStatus::Timeout, txid, message);
        result.error_kind = Some(ErrorKind::Timeout);
        result
    }

    pub fn already_submitted(
        plan: &TransactionPlan,
        txid: &str,
        confirmed_round: Option<u64>,
        node_message: &str,
    ) -> Self {
        let mut result = Self::for_plan(
            plan,
            ExecutionStatus::AlreadySubmitted,
            txid,
            format!("Group was already submitted: {}", node_message),
        );
        result.confirmed_round = confirmed_round;
        result.error_kind = Some(ErrorKind::AlreadySubmitted);
        result
    }

    /// Failure tied to a plan that never made it onto the ledger.
    pub fn rejected(plan: &TransactionPlan, txid: Option<&str>, error: &IntentError) -> Self {
        let mut result = Self::failure(Some(plan.id), error);
        result.transaction_id = txid.map(str::to_string);
        result.group_id = plan.group().map(ToString::to_string);
        result
    }

    /// Failure from any stage, classified by the error.
    pub fn failure(plan_id: Option<Uuid>, error: &IntentError) -> Self {
        let mut result = Self::base(plan_id, ExecutionStatus::Failure, error.to_string());
        result.error_kind = Some(error.kind());
        result
    }

    /// Relabel the outcome of a chained follow-up. Failures and timeouts
    /// are reported as `ChainedActionFailed`.
    pub fn as_chained(mut self) -> Self {
        if !self.status.is_success() {
            self.error_kind = Some(ErrorKind::ChainedActionFailed);
            self.message = format!("Chained action did not complete: {}", self.message);
        }
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }
}

/// Follow-up operation derived from a successful result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainedAction {
    /// Id of the result that triggered this action.
    pub triggered_by: Uuid,
    pub reason: String,
    pub operation: NormalizedOperation,
}
