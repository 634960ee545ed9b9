//! Error types module
//!
//! `RelayError` covers the outcomes that end an invocation in the `Failed`
//! state, plus configuration failures that abort the process before any
//! invocation runs. Validation and transfer problems are *not* errors here:
//! they are folded into the transfer result and reported to the recipient.
//! Notification and status-record failures are logged where they happen and
//! never escalate.

use std::time::Duration;

use crate::config::ConfigError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors like malformed requests
    Debug,
    Warn,
    /// Unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP-style status code of the invocation outcome
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "INVALID_REQUEST")
    fn error_code(&self) -> &'static str;

    /// Whether the process must stop (as opposed to failing one invocation)
    fn is_fatal(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Invocation timed out after {0:?}")]
    TimedOut(Duration),

    /// The invocation itself broke down (for example its task panicked)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for RelayError {
    fn from(err: validator::ValidationErrors) -> Self {
        RelayError::InvalidRequest(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (status, error_code, fatal, sensitive, log_level).
fn relay_error_static_metadata(err: &RelayError) -> (u16, &'static str, bool, bool, LogLevel) {
    match err {
        RelayError::InvalidRequest(_) => (500, "INVALID_REQUEST", false, false, LogLevel::Warn),
        RelayError::Configuration(_) => (500, "CONFIGURATION_ERROR", true, true, LogLevel::Error),
        RelayError::TimedOut(_) => (500, "TIMED_OUT", false, false, LogLevel::Error),
        RelayError::Internal(_) => (500, "INTERNAL_ERROR", false, true, LogLevel::Error),
    }
}

impl RelayError {
    pub fn error_type(&self) -> &str {
        match self {
            RelayError::InvalidRequest(_) => "InvalidRequest",
            RelayError::Configuration(_) => "Configuration",
            RelayError::TimedOut(_) => "TimedOut",
            RelayError::Internal(_) => "Internal",
        }
    }

    /// Error message including the source chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for RelayError {
    fn http_status_code(&self) -> u16 {
        relay_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        relay_error_static_metadata(self).1
    }

    fn is_fatal(&self) -> bool {
        relay_error_static_metadata(self).2
    }

    fn is_sensitive(&self) -> bool {
        relay_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        relay_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            RelayError::InvalidRequest(ref msg) => msg.clone(),
            RelayError::Configuration(_) => "Service is misconfigured".to_string(),
            RelayError::TimedOut(_) => "Submission processing timed out".to_string(),
            RelayError::Internal(_) => "Error processing submission".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_fatal() {
        let err = RelayError::from(ConfigError::Missing("S3_BUCKET"));
        assert!(err.is_fatal());
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Service is misconfigured");
    }

    #[test]
    fn invocation_errors_map_to_500() {
        let err = RelayError::InvalidRequest("recipient address is empty".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert!(!err.is_fatal());
        assert_eq!(err.client_message(), "recipient address is empty");
        assert_eq!(err.log_level(), LogLevel::Warn);

        let err = RelayError::TimedOut(Duration::from_secs(30));
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "TIMED_OUT");
    }

    #[test]
    fn detailed_message_includes_source_chain() {
        let err = RelayError::from(ConfigError::Missing("DATABASE_URL"));
        let details = err.detailed_message();
        assert!(details.starts_with("Configuration error"));
        assert!(details.contains("Caused by"));
        assert!(details.contains("DATABASE_URL"));

        let err = RelayError::Internal("invocation task panicked".to_string());
        assert_eq!(err.detailed_message(), "Internal error: invocation task panicked");
        assert_eq!(err.client_message(), "Error processing submission");
    }
}
