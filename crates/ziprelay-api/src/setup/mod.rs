//! Application setup and initialization

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use ziprelay_core::Config;

/// Build the orchestrator and the router from configuration.
pub async fn initialize_app(config: &Config) -> Result<(Arc<AppState>, axum::Router)> {
    let orchestrator = ziprelay_services::build_orchestrator(config)
        .await
        .context("Failed to initialize relay collaborators")?;

    let state = Arc::new(AppState::new(orchestrator, config.environment()));
    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
