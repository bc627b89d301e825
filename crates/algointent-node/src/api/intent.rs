//! Intent API endpoints.

use axum::{extract::State, http::StatusCode, Json};
use algointent_core::encoding::encode_base64;
use algointent_core::{Intent, OperationKind, PlanOrigin, Result};
use algointent_signer::requests_for;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::api::ApiError;
use crate::state::{AppState, PlanRecord};

/// One position of a prepared plan, as shown to an external wallet.
#[derive(Debug, Serialize)]
pub struct UnsignedTransaction {
    pub position: usize,
    pub txid: String,
    pub signer: String,
    /// Canonical unsigned bytes, base64.
    pub unsigned: String,
    pub requires_signature: bool,
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub plan_id: Uuid,
    pub operation: OperationKind,
    pub origin: PlanOrigin,
    pub group_id: Option<String>,
    pub total_fee: u64,
    pub transactions: Vec<UnsignedTransaction>,
    pub metadata: serde_json::Value,
    pub chained_from: Option<Uuid>,
    pub result: Option<algointent_core::ExecutionResult>,
}

impl PlanResponse {
    pub fn from_record(record: &PlanRecord) -> Result<Self> {
        let plan = &record.prepared.plan;
        let transactions = requests_for(plan)?
            .into_iter()
            .map(|request| UnsignedTransaction {
                position: request.position,
                txid: request.txid,
                signer: request.signer.to_string(),
                unsigned: encode_base64(&request.unsigned),
                requires_signature: request.requires_signature,
                summary: request.summary,
            })
            .collect();

        Ok(Self {
            plan_id: plan.id,
            operation: plan.operation,
            origin: plan.origin.clone(),
            group_id: plan.group().map(ToString::to_string),
            total_fee: plan.total_fee(),
            transactions,
            metadata: plan.metadata.clone(),
            chained_from: record.chained_from,
            result: record.result.clone(),
        })
    }
}

/// Normalize, build and group an intent, and hold the plan for signing.
pub async fn prepare_intent(
    State(state): State<AppState>,
    Json(intent): Json<Intent>,
) -> std::result::Result<(StatusCode, Json<PlanResponse>), ApiError> {
    let prepared = state.engine.prepare(&intent).await?;
    let id = state.store_plan(prepared, None).await;
    info!("Holding plan {} for '{}'", id, intent.operation);

    let record = state
        .get_plan(id)
        .await
        .ok_or_else(|| algointent_core::IntentError::Internal(format!("plan {} vanished", id)))?;
    Ok((StatusCode::CREATED, Json(PlanResponse::from_record(&record)?)))
}
