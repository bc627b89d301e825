//! HTTP API handlers.

pub mod health;
pub mod intent;
pub mod plan;
pub mod simulate;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use algointent_core::{ErrorKind, IntentError};
use serde::Serialize;

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error_kind: ErrorKind,
    pub message: String,
}

impl From<&IntentError> for ErrorBody {
    fn from(err: &IntentError) -> Self {
        Self {
            error_kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ApiError(pub IntentError);

impl From<IntentError> for ApiError {
    fn from(err: IntentError) -> Self {
        ApiError(err)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Resolution => StatusCode::NOT_FOUND,
        ErrorKind::Build => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::SigningDeclined
        | ErrorKind::SubmissionRejected
        | ErrorKind::Timeout
        | ErrorKind::ChainedActionFailed
        | ErrorKind::AlreadySubmitted => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody::from(&self.0);
        (status_for(body.error_kind), Json(body)).into_response()
    }
}
