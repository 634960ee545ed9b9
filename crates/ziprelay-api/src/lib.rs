//! ZipRelay API Library
//!
//! HTTP trigger adapter: accepts submissions directly or wrapped in SNS
//! envelopes and runs one orchestrator invocation per request.

mod handlers;

pub mod error;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
