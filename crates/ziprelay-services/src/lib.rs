//! ZipRelay Services
//!
//! Source validation, the streaming transfer and the per-invocation
//! orchestration that ties storage, the status table and notification together.

pub mod bootstrap;
pub mod orchestrator;
pub mod source;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use bootstrap::build_orchestrator;
pub use orchestrator::{
    outcome_for, Collaborators, OrchestratorSettings, PlannedDestination, TransferOrchestrator,
};
pub use source::{build_http_client, SourceValidator};
