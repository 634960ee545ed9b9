//! PostgreSQL status table tests.
//!
//! These run only when `TEST_DATABASE_URL` points at a disposable database.

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;
use ziprelay_core::models::{StatusRecord, TransferResult};
use ziprelay_core::RecordKeyStrategy;
use ziprelay_db::{PgStatusStore, StatusStore, StatusStoreError};

struct TestTable {
    pool: PgPool,
    store: PgStatusStore,
}

impl TestTable {
    /// `(details, succeeded)` of every row for `recipient`, oldest first
    async fn rows_for(&self, recipient: &str) -> Vec<(String, bool)> {
        let sql = format!(
            "SELECT details, succeeded FROM {} WHERE recipient_address = $1 ORDER BY recorded_at",
            self.store.table()
        );
        sqlx::query_as::<_, (String, bool)>(&sql)
            .bind(recipient)
            .fetch_all(&self.pool)
            .await
            .expect("query rows")
    }

    async fn details_for_key(&self, recipient_key: &str) -> Option<String> {
        let sql = format!(
            "SELECT details FROM {} WHERE recipient_key = $1",
            self.store.table()
        );
        sqlx::query_scalar::<_, String>(&sql)
            .bind(recipient_key)
            .fetch_optional(&self.pool)
            .await
            .expect("query row")
    }

    async fn teardown(self) {
        let sql = format!("DROP TABLE IF EXISTS {}", self.store.table());
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .expect("drop table");
    }
}

async fn setup() -> Option<TestTable> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set, skipping");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect to test database");
    let table = format!("status_test_{}", Uuid::new_v4().simple());
    let store = PgStatusStore::new(pool.clone(), table).expect("valid table name");
    store.ensure_schema().await.expect("create status table");
    Some(TestTable { pool, store })
}

fn record(recipient: &str) -> StatusRecord {
    StatusRecord::from_result(
        &TransferResult::success("https://cdn.example.com/a.zip", 42),
        recipient,
        RecordKeyStrategy::Uuid,
        Utc::now(),
    )
}

#[tokio::test]
async fn appends_one_row_per_invocation() {
    let Some(table) = setup().await else { return };

    let first = record("a@b.com");
    let second = record("a@b.com");
    table.store.append(&first).await.unwrap();
    table.store.append(&second).await.unwrap();

    let rows = table.rows_for("a@b.com").await;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|(details, succeeded)| *succeeded && *details == first.details));

    table.teardown().await;
}

#[tokio::test]
async fn ensure_schema_is_repeatable() {
    let Some(table) = setup().await else { return };

    table.store.ensure_schema().await.unwrap();
    table.store.append(&record("a@b.com")).await.unwrap();
    assert_eq!(table.rows_for("a@b.com").await.len(), 1);

    table.teardown().await;
}

#[tokio::test]
async fn never_overwrites_existing_key() {
    let Some(table) = setup().await else { return };

    let first = record("a@b.com");
    table.store.append(&first).await.unwrap();

    let mut clash = record("a@b.com");
    clash.recipient_key = first.recipient_key.clone();
    clash.details = "Failed. overwritten".to_string();

    let err = table.store.append(&clash).await.unwrap_err();
    assert!(matches!(err, StatusStoreError::Duplicate(_)));

    assert_eq!(
        table.details_for_key(&first.recipient_key).await.as_deref(),
        Some(first.details.as_str())
    );

    table.teardown().await;
}
