//! Data models for the relay
//!
//! Everything here is scoped to a single invocation except [`StatusRecord`],
//! which is persisted once and never touched again.

mod invocation;
mod naming;
mod status;
mod submission;
mod transfer;
mod validation;

pub use invocation::{InvocationOutcome, InvocationReport, InvocationState};
pub use naming::{base_name_of, uniqueness_token, StoredObjectName};
pub use status::StatusRecord;
pub use submission::SubmissionRequest;
pub use transfer::TransferResult;
pub use validation::{ValidationOutcome, ValidationReason};
