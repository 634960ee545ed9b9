//! SNS-shaped triggers: Lambda-style event records or SNS HTTP notifications.

use crate::error::HttpAppError;
use crate::handlers::outcome_response;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use ziprelay_core::models::SubmissionRequest;
use ziprelay_core::TriggerEnvelope;

pub async fn sns_event(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Response, HttpAppError> {
    match TriggerEnvelope::from_sns_event(&body)? {
        TriggerEnvelope::Submission(request) => {
            let request = SubmissionRequest::new(request.source_url, request.recipient_address);
            Ok(outcome_response(state.orchestrator.invoke(request).await).into_response())
        }
        TriggerEnvelope::SubscriptionConfirmation {
            topic_arn,
            subscribe_url,
        } => {
            tracing::info!(
                topic_arn = ?topic_arn,
                subscribe_url = ?subscribe_url,
                "SNS subscription confirmation received; confirm it out of band"
            );
            Ok((
                StatusCode::OK,
                Json(serde_json::json!({ "message": "Subscription confirmation received" })),
            )
                .into_response())
        }
    }
}
