use crate::error::ValidatedJson;
use crate::handlers::outcome_response;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;
use ziprelay_core::models::SubmissionRequest;

/// Run one invocation for a submission posted directly.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SubmissionRequest>,
) -> impl IntoResponse {
    let request = SubmissionRequest::new(request.source_url, request.recipient_address);
    outcome_response(state.orchestrator.invoke(request).await)
}
