//! Storage abstraction trait
//!
//! This module defines the Storage trait that all destination backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// The incoming byte stream failed (origin dropped mid-transfer)
    #[error("Source read failed: {0}")]
    SourceRead(String),

    /// The destination rejected the write
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Publishing failed: {0}")]
    PublishFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// True when the failure happened on the read side of a transfer.
    pub fn is_source_failure(&self) -> bool {
        matches!(self, StorageError::SourceRead(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunks of an object being written
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Destination store abstraction
///
/// Objects written with [`Storage::put_stream`] are private. They only become
/// reachable at [`Storage::public_url`] after [`Storage::make_public`], and
/// backends never expose an object whose write did not complete.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `body` to `key` incrementally and return the number of bytes stored.
    ///
    /// Memory use is bounded by the backend's part size, not by the object size.
    /// On error nothing is left at `key`.
    async fn put_stream(
        &self,
        key: &str,
        content_type: &str,
        body: ByteStream,
    ) -> StorageResult<u64>;

    /// Make a completely written object publicly addressable and return its URL.
    async fn make_public(&self, key: &str) -> StorageResult<String>;

    /// Delete an object, public or not
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// URL an object has (or will have) once public
    fn public_url(&self, key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
