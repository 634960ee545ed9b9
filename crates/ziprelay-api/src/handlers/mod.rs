pub mod health;
pub mod sns;
pub mod submissions;

use axum::{http::StatusCode, response::IntoResponse, Json};
use ziprelay_core::models::InvocationOutcome;

/// Answer with the orchestrator's status code and body.
pub(crate) fn outcome_response(outcome: InvocationOutcome) -> impl IntoResponse {
    let status =
        StatusCode::from_u16(outcome.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(outcome.body))
}
