//! Status table repository: append-only rows, one per invocation.

use async_trait::async_trait;
use sqlx::PgPool;
use ziprelay_core::config::is_sql_identifier;
use ziprelay_core::models::StatusRecord;

#[derive(Debug, thiserror::Error)]
pub enum StatusStoreError {
    /// A row with this key already exists. Rows are never overwritten.
    #[error("Status record {0} already exists")]
    Duplicate(String),

    #[error("Invalid status table name: {0}")]
    InvalidTable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Append-only store of invocation outcomes
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Persist `record` under its `recipient_key`. Never overwrites.
    async fn append(&self, record: &StatusRecord) -> Result<(), StatusStoreError>;
}

/// PostgreSQL status table.
///
/// The table name comes from configuration and is interpolated into SQL, so it
/// is checked against [`is_sql_identifier`] on construction.
#[derive(Clone)]
pub struct PgStatusStore {
    pool: PgPool,
    table: String,
}

impl PgStatusStore {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Result<Self, StatusStoreError> {
        let table = table.into();
        if !is_sql_identifier(&table) {
            return Err(StatusStoreError::InvalidTable(table));
        }
        Ok(Self { pool, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the status table and its recipient index if absent.
    #[tracing::instrument(skip(self), fields(db.table = %self.table))]
    pub async fn ensure_schema(&self) -> Result<(), StatusStoreError> {
        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                recipient_key TEXT PRIMARY KEY,
                recipient_address TEXT NOT NULL,
                succeeded BOOLEAN NOT NULL,
                details TEXT NOT NULL,
                public_location TEXT,
                recorded_at TIMESTAMPTZ NOT NULL
            )
            "#,
            table = self.table
        );
        sqlx::query(&create_table).execute(&self.pool).await?;

        let create_index = format!(
            "CREATE INDEX IF NOT EXISTS {table}_recipient_idx ON {table} (recipient_address, recorded_at)",
            table = self.table
        );
        sqlx::query(&create_index).execute(&self.pool).await?;

        Ok(())
    }
}

#[async_trait]
impl StatusStore for PgStatusStore {
    #[tracing::instrument(
        skip(self, record),
        fields(db.table = %self.table, recipient_key = %record.recipient_key)
    )]
    async fn append(&self, record: &StatusRecord) -> Result<(), StatusStoreError> {
        let sql = format!(
            r#"
            INSERT INTO {} (recipient_key, recipient_address, succeeded, details, public_location, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
            self.table
        );

        let result = sqlx::query(&sql)
            .bind(&record.recipient_key)
            .bind(&record.recipient_address)
            .bind(record.succeeded)
            .bind(&record.details)
            .bind(&record.public_location)
            .bind(record.recorded_at)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                StatusStoreError::Duplicate(record.recipient_key.clone()),
            ),
            Err(e) => Err(e.into()),
        }
    }
}
