use serde::{Deserialize, Serialize};

/// Outcome of one invocation's transfer step, shared by the notification and
/// the status record. Built once and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    public_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes_transferred: Option<u64>,
}

impl TransferResult {
    pub fn success(public_location: impl Into<String>, bytes_transferred: u64) -> Self {
        Self {
            succeeded: true,
            public_location: Some(public_location.into()),
            failure_detail: None,
            bytes_transferred: Some(bytes_transferred),
        }
    }

    /// Success announced before the bytes have moved.
    pub fn planned(public_location: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            public_location: Some(public_location.into()),
            failure_detail: None,
            bytes_transferred: None,
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            public_location: None,
            failure_detail: Some(detail.into()),
            bytes_transferred: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn public_location(&self) -> Option<&str> {
        self.public_location.as_deref()
    }

    pub fn failure_detail(&self) -> Option<&str> {
        self.failure_detail.as_deref()
    }

    pub fn bytes_transferred(&self) -> Option<u64> {
        self.bytes_transferred
    }
}
