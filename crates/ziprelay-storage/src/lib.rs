//! ZipRelay Storage Library
//!
//! This crate provides the destination store abstraction and its S3 and local
//! filesystem implementations.
//!
//! # Storage key format
//!
//! All backends use the same key layout: `{prefix}/{token}/{baseName}`, where
//! `{token}/{baseName}` is a [`ziprelay_core::models::StoredObjectName`].
//! Keys must not contain `..` segments or a leading `/`. Key generation is
//! centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::object_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
pub use ziprelay_core::StorageBackend;
