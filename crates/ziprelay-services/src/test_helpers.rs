//! In-memory collaborators for orchestrator and handler tests.

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use ziprelay_core::models::StatusRecord;
use ziprelay_db::{StatusStore, StatusStoreError};
use ziprelay_notify::{Notifier, NotifyError};
use ziprelay_storage::{ByteStream, Storage, StorageBackend, StorageError, StorageResult};

pub const MEMORY_BASE_URL: &str = "https://archives.example.test";

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content_type: String,
    pub data: Vec<u8>,
    pub public: bool,
}

/// Destination store held in a map. Only complete writes are kept.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
    put_calls: AtomicUsize,
    fail_put: AtomicBool,
    fail_publish: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }

    pub fn fail_publishing(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn objects(&self) -> HashMap<String, StoredObject> {
        self.objects.lock().unwrap().clone()
    }

    pub fn public_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, object)| object.public)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put_stream(
        &self,
        key: &str,
        content_type: &str,
        mut body: ByteStream,
    ) -> StorageResult<u64> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);

        let mut data = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| StorageError::SourceRead(e.to_string()))?;
            data.extend_from_slice(&chunk);
        }

        if self.fail_put.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed("store unavailable".to_string()));
        }

        let size = data.len() as u64;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                data,
                public: false,
            },
        );
        Ok(size)
    }

    async fn make_public(&self, key: &str) -> StorageResult<String> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(StorageError::PublishFailed("acl rejected".to_string()));
        }
        let mut objects = self.objects.lock().unwrap();
        let object = objects
            .get_mut(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        object.public = true;
        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", MEMORY_BASE_URL, key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Status table that keeps rows in insertion order and rejects duplicate keys.
#[derive(Default)]
pub struct MemoryStatusStore {
    records: Mutex<Vec<StatusRecord>>,
    fail: AtomicBool,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<StatusRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn append(&self, record: &StatusRecord) -> Result<(), StatusStoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StatusStoreError::Database(sqlx_unavailable()));
        }
        let mut records = self.records.lock().unwrap();
        if records
            .iter()
            .any(|existing| existing.recipient_key == record.recipient_key)
        {
            return Err(StatusStoreError::Duplicate(record.recipient_key.clone()));
        }
        records.push(record.clone());
        Ok(())
    }
}

fn sqlx_unavailable() -> ziprelay_db::sqlx::Error {
    ziprelay_db::sqlx::Error::PoolTimedOut
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Notifier that remembers what it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
    attempts: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(SentMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
