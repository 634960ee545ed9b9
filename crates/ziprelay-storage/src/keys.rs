//! Shared key layout for storage backends.
//!
//! Key format: `{prefix}/{token}/{baseName}`, or `{token}/{baseName}` when the prefix is empty.

use crate::{StorageError, StorageResult};
use ziprelay_core::models::StoredObjectName;

/// Storage key for `name` under `prefix`. All backends use this format.
pub fn object_key(prefix: &str, name: &StoredObjectName) -> StorageResult<String> {
    let prefix = prefix.trim_matches('/');
    let key = if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    };
    validate_key(&key)?;
    Ok(key)
}

/// Reject keys that could escape the bucket prefix or the storage directory.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    if key.split('/').any(|segment| segment.is_empty() || segment == "..") {
        return Err(StorageError::InvalidKey(
            "Storage key contains an empty or parent segment".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_includes_prefix_and_name() {
        let name = StoredObjectName::new("report.zip", "20240101T000000000Z-abc");
        assert_eq!(
            object_key("submissions", &name).unwrap(),
            "submissions/20240101T000000000Z-abc/report.zip"
        );
        assert_eq!(
            object_key("/nested/prefix/", &name).unwrap(),
            "nested/prefix/20240101T000000000Z-abc/report.zip"
        );
        assert_eq!(
            object_key("", &name).unwrap(),
            "20240101T000000000Z-abc/report.zip"
        );
    }

    #[test]
    fn rejects_traversal() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/abs/key").is_err());
        assert!(validate_key("a//b").is_err());
        assert!(validate_key("a/b.zip").is_ok());
    }
}
