use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::RelayError;

/// One submission: the archive to relay and who to tell about it.
///
/// Field names accept every spelling the trigger has used over time
/// (`http`/`Mail`, `submission_url`/`user_email`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    #[serde(alias = "http", alias = "submission_url", alias = "source_url")]
    #[validate(url(message = "Source URL must be an absolute URL"))]
    pub source_url: String,

    #[serde(alias = "Mail", alias = "user_email", alias = "recipient_address")]
    #[validate(
        length(min = 1, message = "Recipient address must not be empty"),
        email(message = "Recipient address must be an email address")
    )]
    pub recipient_address: String,
}

impl SubmissionRequest {
    pub fn new(source_url: impl Into<String>, recipient_address: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into().trim().to_string(),
            recipient_address: recipient_address.into().trim().to_string(),
        }
    }

    /// Fail fast on requests the orchestrator cannot act on.
    pub fn ensure_valid(&self) -> Result<(), RelayError> {
        self.validate()?;
        Ok(())
    }
}
