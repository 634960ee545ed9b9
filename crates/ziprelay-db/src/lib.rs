//! ZipRelay Database Library
//!
//! The status table: one append-only row per invocation.

pub mod db;

pub use db::{connect_pool, PgStatusStore, StatusStore, StatusStoreError};
pub use sqlx;
