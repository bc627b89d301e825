//! Simulation endpoint.

use axum::{extract::State, Json};
use algointent_core::{Intent, OperationKind};
use serde::Serialize;
use uuid::Uuid;

use crate::api::ErrorBody;
use crate::state::AppState;

/// Response from simulation.
#[derive(Debug, Serialize)]
pub struct SimulateResponse {
    pub simulation_id: Uuid,
    pub success: bool,
    pub operation: Option<OperationKind>,
    pub descriptor_count: usize,
    pub total_fee: u64,
    pub group_id: Option<String>,
    pub error: Option<ErrorBody>,
}

/// Dry-run an intent: normalize, build and group, but hold nothing.
pub async fn simulate_intent(
    State(state): State<AppState>,
    Json(intent): Json<Intent>,
) -> Json<SimulateResponse> {
    let response = match state.engine.prepare(&intent).await {
        Ok(prepared) => SimulateResponse {
            simulation_id: Uuid::new_v4(),
            success: true,
            operation: Some(prepared.plan.operation),
            descriptor_count: prepared.plan.len(),
            total_fee: prepared.plan.total_fee(),
            group_id: prepared.plan.group().map(ToString::to_string),
            error: None,
        },
        Err(e) => SimulateResponse {
            simulation_id: Uuid::new_v4(),
            success: false,
            operation: None,
            descriptor_count: 0,
            total_fee: 0,
            group_id: None,
            error: Some(ErrorBody::from(&e)),
        },
    };
    Json(response)
}
