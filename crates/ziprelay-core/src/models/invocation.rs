use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TransferResult;

/// Progress of a single invocation. States only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvocationState {
    Received,
    Validating,
    Transferring,
    Skipped,
    Notifying,
    Recording,
    Done,
    Failed,
}

impl Display for InvocationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            InvocationState::Received => "RECEIVED",
            InvocationState::Validating => "VALIDATING",
            InvocationState::Transferring => "TRANSFERRING",
            InvocationState::Skipped => "SKIPPED",
            InvocationState::Notifying => "NOTIFYING",
            InvocationState::Recording => "RECORDING",
            InvocationState::Done => "DONE",
            InvocationState::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// Summary of a completed invocation.
///
/// A failed submission (bad source, failed transfer) still completes as
/// `Done`; the business outcome lives in `result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationReport {
    pub invocation_id: Uuid,
    pub state: InvocationState,
    pub result: TransferResult,
    pub notification_sent: bool,
    pub record_written: bool,
}

impl InvocationReport {
    pub fn status_code(&self) -> u16 {
        match self.state {
            InvocationState::Failed => 500,
            _ => 200,
        }
    }
}

/// What the trigger sees: an HTTP-style status code and a JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationOutcome {
    pub status_code: u16,
    pub body: serde_json::Value,
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}
