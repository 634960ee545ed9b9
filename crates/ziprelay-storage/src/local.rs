use crate::keys::validate_key;
use crate::traits::{ByteStream, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Directory under the base path holding objects that are not public yet
const STAGING_DIR: &str = ".staging";
const PARTIAL_SUFFIX: &str = ".partial";

/// Local filesystem storage implementation
///
/// `base_path` is what gets served at `base_url`. Writes land in
/// `{base_path}/.staging/{key}.partial`, are renamed to drop the suffix once
/// complete, and move to `{base_path}/{key}` when made public.
///
/// The filesystem keeps no per-object metadata, so the content type passed to
/// [`Storage::put_stream`] is not stored. The server in front of `base_path`
/// decides it, normally from the `.zip` extension every key ends with.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/ziprelay/files")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:4000/files")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(base_path.join(STAGING_DIR))
            .await
            .map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    base_path.display(),
                    e
                ))
            })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Path served publicly for `key`
    fn public_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        if key == STAGING_DIR || key.starts_with(&format!("{}/", STAGING_DIR)) {
            return Err(StorageError::InvalidKey(
                "Storage key resolves into the staging directory".to_string(),
            ));
        }
        Ok(self.base_path.join(key))
    }

    /// Path of a completely written, not yet public object
    fn staged_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(STAGING_DIR).join(key))
    }

    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_partial(
        &self,
        partial: &Path,
        mut body: ByteStream,
    ) -> StorageResult<u64> {
        let mut file = fs::File::create(partial).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create file {}: {}",
                partial.display(),
                e
            ))
        })?;

        let mut size: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| StorageError::SourceRead(e.to_string()))?;
            file.write_all(&chunk).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to write file {}: {}",
                    partial.display(),
                    e
                ))
            })?;
            size += chunk.len() as u64;
        }

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", partial.display(), e))
        })?;

        Ok(size)
    }
}

async fn remove_if_present(path: &Path) -> StorageResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::DeleteFailed(format!(
            "Failed to delete file {}: {}",
            path.display(),
            e
        ))),
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put_stream(
        &self,
        key: &str,
        _content_type: &str,
        body: ByteStream,
    ) -> StorageResult<u64> {
        // Reject keys that could never be published before writing anything
        self.public_path(key)?;
        let staged = self.staged_path(key)?;
        let partial = PathBuf::from(format!("{}{}", staged.display(), PARTIAL_SUFFIX));

        self.ensure_parent_dir(&staged).await?;

        let start = std::time::Instant::now();

        let size = match self.write_partial(&partial, body).await {
            Ok(size) => size,
            Err(e) => {
                if let Err(cleanup_err) = remove_if_present(&partial).await {
                    tracing::warn!(error = %cleanup_err, key = %key, "Failed to remove partial file");
                }
                tracing::error!(
                    error = %e,
                    path = %partial.display(),
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage stream upload failed"
                );
                return Err(e);
            }
        };

        fs::rename(&partial, &staged).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to finalise file {}: {}",
                staged.display(),
                e
            ))
        })?;

        tracing::info!(
            path = %staged.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage stream upload successful"
        );

        Ok(size)
    }

    async fn make_public(&self, key: &str) -> StorageResult<String> {
        let staged = self.staged_path(key)?;
        let public = self.public_path(key)?;

        if !fs::try_exists(&staged).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        self.ensure_parent_dir(&public).await?;
        fs::rename(&staged, &public).await.map_err(|e| {
            StorageError::PublishFailed(format!(
                "Failed to publish file {}: {}",
                public.display(),
                e
            ))
        })?;

        Ok(self.generate_url(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let removed_public = remove_if_present(&self.public_path(key)?).await?;
        let removed_staged = remove_if_present(&self.staged_path(key)?).await?;

        if !removed_public && !removed_staged {
            tracing::warn!(key = %key, "Local storage delete: object not found");
        } else {
            tracing::info!(key = %key, "Local storage delete successful");
        }

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        self.generate_url(key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
