//! Application state shared by every handler.

use ziprelay_services::TransferOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: TransferOrchestrator,
    pub environment: String,
}

impl AppState {
    pub fn new(orchestrator: TransferOrchestrator, environment: impl Into<String>) -> Self {
        Self {
            orchestrator,
            environment: environment.into(),
        }
    }
}
