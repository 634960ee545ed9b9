//! ZipRelay Core Library
//!
//! This crate provides the data model, trigger envelope decoding, relay policy,
//! error types and configuration shared by every ziprelay component.

pub mod config;
pub mod envelope;
pub mod error;
pub mod models;
pub mod policy;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, ConfigError, LogFormat, NotifierKind};
pub use envelope::{EnvelopeError, TriggerEnvelope};
pub use error::{ErrorMetadata, LogLevel, RelayError};
pub use policy::{NotifyOrder, RecordKeyStrategy, RelayPolicy};
pub use storage_types::StorageBackend;
