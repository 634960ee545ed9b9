//! Destination object naming
//!
//! Every invocation stores its archive under `{token}/{baseName}`. The token
//! combines a millisecond UTC timestamp with a random UUID, so identical
//! source URLs submitted at the same instant still land on distinct objects.

use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MAX_BASE_NAME_LENGTH: usize = 200;
const FALLBACK_BASE_NAME: &str = "archive.zip";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoredObjectName {
    token: String,
    base_name: String,
}

impl StoredObjectName {
    /// Deterministic constructor; `base_name` is sanitised.
    pub fn new(base_name: &str, token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_name: sanitize_base_name(base_name),
        }
    }

    /// Fresh name for an archive fetched from `source`.
    pub fn generate(source: &Url, now: DateTime<Utc>) -> Self {
        Self::new(&base_name_of(source), uniqueness_token(now))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }
}

impl Display for StoredObjectName {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.token, self.base_name)
    }
}

/// `YYYYMMDDTHHMMSSfffZ-{uuid}`
pub fn uniqueness_token(now: DateTime<Utc>) -> String {
    format!(
        "{}-{}",
        now.format("%Y%m%dT%H%M%S%3fZ"),
        Uuid::new_v4().simple()
    )
}

/// Percent-decoded last path segment of `source`.
pub fn base_name_of(source: &Url) -> String {
    source
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .unwrap_or_default()
}

fn sanitize_base_name(name: &str) -> String {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let sanitized: String = name
        .chars()
        .take(MAX_BASE_NAME_LENGTH)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = sanitized.trim_matches('.');
    if trimmed.is_empty() || trimmed.contains("..") {
        return FALLBACK_BASE_NAME.to_string();
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn name_is_deterministic_given_base_and_token() {
        let a = StoredObjectName::new("report.zip", "tok");
        let b = StoredObjectName::new("report.zip", "tok");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "tok/report.zip");
    }

    #[test]
    fn generated_names_never_collide() {
        let url = Url::parse("https://host/files/archive.zip").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let first = StoredObjectName::generate(&url, now);
        let second = StoredObjectName::generate(&url, now);

        assert_ne!(first, second);
        assert_eq!(first.base_name(), "archive.zip");
        assert!(first.token().starts_with("20240506T070809000Z-"));
    }

    #[test]
    fn base_name_is_decoded_and_sanitised() {
        let url = Url::parse("https://host/dir/My%20Archive%20(1).zip?x=1").unwrap();
        let name = StoredObjectName::new(&base_name_of(&url), "t");
        assert_eq!(name.base_name(), "My_Archive__1_.zip");
    }

    #[test]
    fn unusable_base_names_fall_back() {
        assert_eq!(StoredObjectName::new("", "t").base_name(), "archive.zip");
        assert_eq!(StoredObjectName::new("..", "t").base_name(), "archive.zip");
        assert_eq!(
            StoredObjectName::new("a/../b.zip", "t").base_name(),
            "b.zip"
        );

        let url = Url::parse("https://host/").unwrap();
        assert_eq!(
            StoredObjectName::new(&base_name_of(&url), "t").base_name(),
            "archive.zip"
        );
    }
}
