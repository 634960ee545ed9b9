use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TransferResult;
use crate::policy::RecordKeyStrategy;

const SUCCESS_DETAILS: &str = "Success, The URL points to a ZIP file.";
const FAILURE_PREFIX: &str = "Failed.";

/// One row of the status table. Written once per invocation, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub recipient_key: String,
    pub recipient_address: String,
    pub succeeded: bool,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_location: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl StatusRecord {
    pub fn from_result(
        result: &TransferResult,
        recipient: &str,
        strategy: RecordKeyStrategy,
        now: DateTime<Utc>,
    ) -> Self {
        let details = if result.succeeded() {
            SUCCESS_DETAILS.to_string()
        } else {
            match result.failure_detail() {
                Some(detail) => format!("{} {}", FAILURE_PREFIX, detail),
                None => FAILURE_PREFIX.to_string(),
            }
        };

        Self {
            recipient_key: strategy.record_key(recipient, now),
            recipient_address: recipient.to_string(),
            succeeded: result.succeeded(),
            details,
            public_location: result.public_location().map(String::from),
            recorded_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_follow_branch() {
        let now = Utc::now();
        let ok = StatusRecord::from_result(
            &TransferResult::success("https://cdn/x.zip", 10),
            "a@b.com",
            RecordKeyStrategy::Uuid,
            now,
        );
        assert!(ok.succeeded);
        assert_eq!(ok.details, "Success, The URL points to a ZIP file.");
        assert_eq!(ok.public_location.as_deref(), Some("https://cdn/x.zip"));

        let failed = StatusRecord::from_result(
            &TransferResult::failure("The provided URL does not point to a valid ZIP file."),
            "a@b.com",
            RecordKeyStrategy::Uuid,
            now,
        );
        assert!(!failed.succeeded);
        assert_eq!(
            failed.details,
            "Failed. The provided URL does not point to a valid ZIP file."
        );
        assert!(failed.recipient_key.starts_with("a@b.com#"));
    }
}
