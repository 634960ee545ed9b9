use serde::{Deserialize, Serialize};

/// Why a source was accepted or rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationReason {
    Ok,
    /// Path does not end in `.zip`
    NotZipExtension,
    /// HEAD succeeded but advertised a content type outside the accepted set
    WrongContentType,
    /// HEAD failed or returned a non-success status
    Unreachable,
    /// Not a parseable http(s) URL
    InvalidUrl,
    /// Private address or outside the configured allowlist
    ForbiddenHost,
}

impl ValidationReason {
    /// Plain-language explanation shown to the recipient.
    pub fn message(&self) -> &'static str {
        match self {
            ValidationReason::Ok => "The URL points to a ZIP file.",
            ValidationReason::NotZipExtension => {
                "The provided URL does not point to a valid ZIP file."
            }
            ValidationReason::WrongContentType => {
                "The provided URL does not serve a ZIP archive."
            }
            ValidationReason::Unreachable => "The provided URL could not be reached.",
            ValidationReason::InvalidUrl => "The provided URL is not a valid web address.",
            ValidationReason::ForbiddenHost => {
                "The provided URL points to a host that is not allowed."
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationReason::Ok => "OK",
            ValidationReason::NotZipExtension => "NOT_ZIP_EXTENSION",
            ValidationReason::WrongContentType => "WRONG_CONTENT_TYPE",
            ValidationReason::Unreachable => "UNREACHABLE",
            ValidationReason::InvalidUrl => "INVALID_URL",
            ValidationReason::ForbiddenHost => "FORBIDDEN_HOST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub reason: ValidationReason,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: ValidationReason::Ok,
        }
    }

    pub fn rejected(reason: ValidationReason) -> Self {
        Self {
            is_valid: reason == ValidationReason::Ok,
            reason,
        }
    }
}
