//! Relay policy knobs
//!
//! The handful of choices that used to differ between deployments of the relay
//! (stored content type, status-record key shape, notification ordering) are
//! collected here so a single orchestrator can serve all of them.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_STORED_CONTENT_TYPE: &str = "application/zip";

/// How the per-invocation token of a status-record key is produced.
///
/// Both strategies prefix the recipient address, so records for the same
/// recipient sort together while never sharing a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKeyStrategy {
    #[default]
    Uuid,
    Timestamp,
}

impl RecordKeyStrategy {
    /// Build the status-record key for `recipient` at `now`.
    pub fn record_key(&self, recipient: &str, now: DateTime<Utc>) -> String {
        match self {
            RecordKeyStrategy::Uuid => format!("{}#{}", recipient, Uuid::new_v4()),
            RecordKeyStrategy::Timestamp => format!(
                "{}#{}",
                recipient,
                now.to_rfc3339_opts(SecondsFormat::Nanos, true)
            ),
        }
    }
}

impl FromStr for RecordKeyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uuid" => Ok(RecordKeyStrategy::Uuid),
            "timestamp" => Ok(RecordKeyStrategy::Timestamp),
            other => Err(format!("expected 'uuid' or 'timestamp', got '{}'", other)),
        }
    }
}

impl Display for RecordKeyStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RecordKeyStrategy::Uuid => write!(f, "uuid"),
            RecordKeyStrategy::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// Whether the recipient is notified after the transfer (reporting the real
/// outcome) or before it (reporting the validation outcome and planned location).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyOrder {
    #[default]
    AfterTransfer,
    BeforeTransfer,
}

impl FromStr for NotifyOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "after" | "after_transfer" => Ok(NotifyOrder::AfterTransfer),
            "before" | "before_transfer" => Ok(NotifyOrder::BeforeTransfer),
            other => Err(format!("expected 'after' or 'before', got '{}'", other)),
        }
    }
}

impl Display for NotifyOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            NotifyOrder::AfterTransfer => write!(f, "after"),
            NotifyOrder::BeforeTransfer => write!(f, "before"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPolicy {
    pub stored_content_type: String,
    pub record_key_strategy: RecordKeyStrategy,
    pub notify_order: NotifyOrder,
}

impl Default for RelayPolicy {
    fn default() -> Self {
        Self {
            stored_content_type: DEFAULT_STORED_CONTENT_TYPE.to_string(),
            record_key_strategy: RecordKeyStrategy::default(),
            notify_order: NotifyOrder::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn record_keys_start_with_recipient() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let key = RecordKeyStrategy::Timestamp.record_key("a@b.com", now);
        assert_eq!(key, "a@b.com#2024-03-01T12:00:00.000000000Z");

        let key = RecordKeyStrategy::Uuid.record_key("a@b.com", now);
        assert!(key.starts_with("a@b.com#"));
        assert!(Uuid::parse_str(&key["a@b.com#".len()..]).is_ok());
    }

    #[test]
    fn uuid_keys_differ_for_same_instant() {
        let now = Utc::now();
        let first = RecordKeyStrategy::Uuid.record_key("a@b.com", now);
        let second = RecordKeyStrategy::Uuid.record_key("a@b.com", now);
        assert_ne!(first, second);
    }

    #[test]
    fn parses_policy_values() {
        assert_eq!(
            "Timestamp".parse::<RecordKeyStrategy>().unwrap(),
            RecordKeyStrategy::Timestamp
        );
        assert_eq!(
            "before".parse::<NotifyOrder>().unwrap(),
            NotifyOrder::BeforeTransfer
        );
        assert!("sometimes".parse::<NotifyOrder>().is_err());
    }
}
