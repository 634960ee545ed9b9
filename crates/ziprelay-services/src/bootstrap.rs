//! Builds the orchestrator and its collaborators from configuration.

use anyhow::Context;
use std::sync::Arc;

use ziprelay_core::Config;
use ziprelay_db::{connect_pool, PgStatusStore};
use ziprelay_notify::create_notifier;
use ziprelay_storage::create_storage;

use crate::orchestrator::{Collaborators, OrchestratorSettings, TransferOrchestrator};
use crate::source::build_http_client;

/// Connect every collaborator and make sure the status table exists.
pub async fn build_orchestrator(config: &Config) -> anyhow::Result<TransferOrchestrator> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize destination storage")?;
    tracing::info!(backend = ?storage.backend_type(), "Storage initialized");

    let pool = connect_pool(config.database())
        .await
        .context("Failed to connect to database")?;
    let status_store = PgStatusStore::new(pool, config.database().status_table.clone())
        .context("Invalid status table configuration")?;
    status_store
        .ensure_schema()
        .await
        .context("Failed to prepare status table")?;
    tracing::info!(table = %status_store.table(), "Status table ready");

    let notifier = create_notifier(config).context("Failed to initialize notifier")?;

    let http = build_http_client(config.source()).context("Failed to build HTTP client")?;

    let collaborators = Collaborators {
        storage,
        status_store: Arc::new(status_store),
        notifier,
        http,
    };

    Ok(TransferOrchestrator::new(
        collaborators,
        OrchestratorSettings::from_config(config),
    ))
}
