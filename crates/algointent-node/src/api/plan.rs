//! Plan API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use algointent_core::{ChainedAction, ExecutionResult, IntentError};
use algointent_engine::PreparedPlan;
use algointent_signer::{RelayedDelegate, SignResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::intent::PlanResponse;
use crate::api::{ApiError, ErrorBody};
use crate::state::AppState;

/// Per-position answers from an external wallet, in plan order.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub responses: Vec<SignResponse>,
}

#[derive(Debug, Serialize)]
pub struct ChainedPlan {
    pub action: ChainedAction,
    pub plan: Option<PlanResponse>,
    /// Set when the follow-up could not be prepared.
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub result: ExecutionResult,
    pub chained: Option<ChainedPlan>,
}

fn not_found(id: Uuid) -> ApiError {
    ApiError(IntentError::NotFound {
        resource_type: "plan".to_string(),
        id: id.to_string(),
    })
}

/// Get a held plan and its outcome, if submitted.
pub async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlanResponse>, ApiError> {
    let record = state.get_plan(id).await.ok_or_else(|| not_found(id))?;
    Ok(Json(PlanResponse::from_record(&record)?))
}

/// Submit a held plan with externally collected signatures.
///
/// Failed outcomes are reported in the body with 200; the result itself
/// carries the error kind. A plan that already has a terminal result is
/// not submitted again and its stored result is returned unchanged.
pub async fn submit_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let record = state.get_plan(id).await.ok_or_else(|| not_found(id))?;
    if let Some(result) = record.result {
        info!("Plan {} already finished as {:?}", id, result.status);
        return Ok(Json(SubmitResponse {
            result,
            chained: None,
        }));
    }
    let delegate = RelayedDelegate::new(req.responses);

    let outcome = state
        .engine
        .submit_plan(&record.prepared.plan, &delegate)
        .await;
    info!("Plan {} finished as {:?}", id, outcome.status);

    // A concurrent submit may have recorded first; its result stands.
    let result = state
        .record_result(id, outcome.clone())
        .await
        .unwrap_or_else(|| outcome.clone());
    if result.id != outcome.id {
        return Ok(Json(SubmitResponse {
            result,
            chained: None,
        }));
    }

    let chained = match state.engine.chain(&result, &record.prepared.operation) {
        Some(action) => Some(prepare_chained(&state, id, action).await),
        None => None,
    };

    Ok(Json(SubmitResponse { result, chained }))
}

/// Prepare the follow-up so the wallet can sign it as a separate plan.
async fn prepare_chained(state: &AppState, parent: Uuid, action: ChainedAction) -> ChainedPlan {
    let prepared = match state.engine.prepare_operation(&action.operation).await {
        Ok(plan) => PreparedPlan {
            operation: action.operation.clone(),
            plan,
        },
        Err(e) => {
            warn!("Chained action for plan {} failed to build: {}", parent, e);
            return ChainedPlan {
                action,
                plan: None,
                error: Some(ErrorBody::from(&e)),
            };
        }
    };

    let id = state.store_plan(prepared, Some(parent)).await;
    let plan = match state.get_plan(id).await {
        Some(record) => PlanResponse::from_record(&record),
        None => Err(IntentError::Internal(format!("plan {} vanished", id))),
    };
    match plan {
        Ok(plan) => ChainedPlan {
            action,
            plan: Some(plan),
            error: None,
        },
        Err(e) => ChainedPlan {
            action,
            plan: None,
            error: Some(ErrorBody::from(&e)),
        },
    }
}
