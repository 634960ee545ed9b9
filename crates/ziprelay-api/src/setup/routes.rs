//! Route configuration

use crate::handlers::{health, sns, submissions};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Trigger bodies are small JSON documents
const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn setup_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/v1/submissions", post(submissions::submit))
        .route("/v1/events/sns", post(sns::sns_event))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
