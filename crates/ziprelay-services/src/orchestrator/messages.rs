//! Recipient-facing wording. Internal error details never reach these strings.

use ziprelay_core::models::TransferResult;

/// Detail used when the transfer itself fails, whichever side failed
pub const TRANSFER_FAILED_DETAIL: &str = "The file could not be transferred to storage.";

const SUCCESS_PREFIX: &str =
    "Your submission is processed successfully. You can find the file here:";
const FAILURE_PREFIX: &str = "Your submission failed.";

/// Notification body for `result`.
pub fn notification_body(result: &TransferResult) -> String {
    if result.succeeded() {
        match result.public_location() {
            Some(location) => format!("{} {}", SUCCESS_PREFIX, location),
            None => "Your submission is processed successfully.".to_string(),
        }
    } else {
        match result.failure_detail() {
            Some(detail) => format!("{} {}", FAILURE_PREFIX, detail),
            None => FAILURE_PREFIX.to_string(),
        }
    }
}
