//! Transfer orchestrator
//!
//! One invocation is a straight line:
//!
//! ```text
//! RECEIVED -> VALIDATING -> TRANSFERRING | SKIPPED -> NOTIFYING -> RECORDING -> DONE
//! ```
//!
//! With [`NotifyOrder::BeforeTransfer`] the recipient is notified right after
//! validation and the transfer runs afterwards. Validation and transfer
//! failures end up in the [`TransferResult`]; notification and record
//! failures are logged and reported as flags. Only an invalid request, a
//! timeout or an internal fault reaches `FAILED`.

mod messages;

pub use messages::{notification_body, TRANSFER_FAILED_DETAIL};

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::{Client, Url};
use serde_json::json;
use tracing::Instrument;
use uuid::Uuid;

use ziprelay_core::config::SourceConfig;
use ziprelay_core::models::{
    InvocationOutcome, InvocationReport, InvocationState, StatusRecord, StoredObjectName,
    SubmissionRequest, TransferResult, ValidationOutcome,
};
use ziprelay_core::{Config, ErrorMetadata, LogLevel, NotifyOrder, RelayError, RelayPolicy};
use ziprelay_db::StatusStore;
use ziprelay_notify::Notifier;
use ziprelay_storage::{object_key, Storage};

use crate::source::ssrf::{check_source_host, HostRejection};
use crate::source::{open_source_stream, parse_zip_url, SourceValidator};

/// Collaborators built once per process and shared by every invocation
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn Storage>,
    pub status_store: Arc<dyn StatusStore>,
    pub notifier: Arc<dyn Notifier>,
    pub http: Client,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub policy: RelayPolicy,
    pub source: SourceConfig,
    pub key_prefix: String,
    pub subject: String,
    pub invocation_timeout: Option<Duration>,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            policy: config.policy().clone(),
            source: config.source().clone(),
            key_prefix: config.storage().key_prefix.clone(),
            subject: config.notifier().subject.clone(),
            invocation_timeout: config.invocation_timeout(),
        }
    }
}

/// Where one invocation's archive will be stored
#[derive(Debug, Clone)]
pub struct PlannedDestination {
    pub source: Url,
    pub name: StoredObjectName,
    pub key: String,
}

/// Logs every state change of one invocation
struct StateTracker {
    state: InvocationState,
}

impl StateTracker {
    fn new() -> Self {
        tracing::debug!(state = %InvocationState::Received, "Invocation received");
        Self {
            state: InvocationState::Received,
        }
    }

    fn advance(&mut self, next: InvocationState) {
        tracing::debug!(from = %self.state, state = %next, "Invocation state changed");
        self.state = next;
    }

    /// Catch up with a change that was already logged elsewhere.
    fn mark(&mut self, state: InvocationState) {
        self.state = state;
    }
}

#[derive(Clone)]
pub struct TransferOrchestrator {
    collaborators: Collaborators,
    validator: SourceValidator,
    settings: OrchestratorSettings,
}

impl TransferOrchestrator {
    pub fn new(collaborators: Collaborators, settings: OrchestratorSettings) -> Self {
        let validator = SourceValidator::new(collaborators.http.clone(), &settings.source);
        Self {
            collaborators,
            validator,
            settings,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub async fn validate_source(&self, url: &str) -> ValidationOutcome {
        self.validator.validate(url).await
    }

    /// Fresh destination for `url`, or `None` if no valid key can be built.
    pub fn plan_destination(&self, url: &str) -> Option<PlannedDestination> {
        let source = parse_zip_url(url).ok()?;
        let name = StoredObjectName::generate(&source, Utc::now());
        match object_key(&self.settings.key_prefix, &name) {
            Ok(key) => Some(PlannedDestination { source, name, key }),
            Err(e) => {
                tracing::error!(error = %e, name = %name, "Could not build a storage key");
                None
            }
        }
    }

    /// Stream the source into storage and publish it.
    ///
    /// The source host is checked again right before the download, so a name
    /// that started resolving to an internal address after validation is
    /// refused. The object is only made public after the write completes. If
    /// publishing fails the object is deleted.
    #[tracing::instrument(skip(self, destination), fields(key = %destination.key))]
    pub async fn transfer_to_storage(&self, destination: &PlannedDestination) -> TransferResult {
        let start = Instant::now();
        let storage = &self.collaborators.storage;

        let source = &self.settings.source;
        if let Err(rejection) = check_source_host(
            &destination.source,
            source.allow_private_sources,
            source.host_allowlist.as_deref(),
        )
        .await
        {
            let detail = match rejection {
                HostRejection::Forbidden(detail) | HostRejection::Unresolvable(detail) => detail,
            };
            tracing::warn!(detail = %detail, side = "source", "Source host refused before download");
            return TransferResult::failure(TRANSFER_FAILED_DETAIL);
        }

        let body = match open_source_stream(&self.collaborators.http, destination.source.clone())
            .await
        {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, side = "source", "Source download failed");
                return TransferResult::failure(TRANSFER_FAILED_DETAIL);
            }
        };

        let size = match storage
            .put_stream(
                &destination.key,
                &self.settings.policy.stored_content_type,
                body,
            )
            .await
        {
            Ok(size) => size,
            Err(e) => {
                let side = if e.is_source_failure() {
                    "source"
                } else {
                    "destination"
                };
                tracing::warn!(
                    error = %e,
                    side = side,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Transfer failed"
                );
                return TransferResult::failure(TRANSFER_FAILED_DETAIL);
            }
        };

        match storage.make_public(&destination.key).await {
            Ok(location) => {
                tracing::info!(
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Transfer complete"
                );
                TransferResult::success(location, size)
            }
            Err(e) => {
                tracing::error!(error = %e, "Publishing failed, removing stored object");
                if let Err(delete_err) = storage.delete(&destination.key).await {
                    tracing::warn!(error = %delete_err, "Failed to remove unpublished object");
                }
                TransferResult::failure(TRANSFER_FAILED_DETAIL)
            }
        }
    }

    /// Skip the transfer for invalid sources, run it otherwise.
    pub async fn build_result(
        &self,
        validation: &ValidationOutcome,
        destination: Option<&PlannedDestination>,
    ) -> TransferResult {
        if !validation.is_valid {
            return TransferResult::failure(validation.reason.message());
        }
        match destination {
            Some(destination) => self.transfer_to_storage(destination).await,
            None => TransferResult::failure(TRANSFER_FAILED_DETAIL),
        }
    }

    /// Send the one notification for this invocation. Returns whether it went out.
    pub async fn notify(&self, result: &TransferResult, recipient: &str) -> bool {
        let body = notification_body(result);
        match self
            .collaborators
            .notifier
            .send(recipient, &self.settings.subject, &body)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Notification failed");
                false
            }
        }
    }

    /// Append the one status record for this invocation. Returns whether it was written.
    pub async fn record(&self, result: &TransferResult, recipient: &str) -> bool {
        let record = StatusRecord::from_result(
            result,
            recipient,
            self.settings.policy.record_key_strategy,
            Utc::now(),
        );
        match self.collaborators.status_store.append(&record).await {
            Ok(()) => {
                tracing::debug!(recipient_key = %record.recipient_key, "Status record written");
                true
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    recipient_key = %record.recipient_key,
                    "Status record write failed"
                );
                false
            }
        }
    }

    /// Notify and record independently; a failure of one never skips the other.
    ///
    /// Returns `(notification_sent, record_written)`.
    pub async fn notify_and_record(&self, result: &TransferResult, recipient: &str) -> (bool, bool) {
        let notified = self.notify(result, recipient).await;
        tracing::debug!(
            from = %InvocationState::Notifying,
            state = %InvocationState::Recording,
            "Invocation state changed"
        );
        let recorded = self.record(result, recipient).await;
        (notified, recorded)
    }

    /// Run one invocation.
    pub async fn handle(&self, request: SubmissionRequest) -> Result<InvocationReport, RelayError> {
        self.run(Uuid::new_v4(), request).await
    }

    /// Run one invocation under the configured timeout and map it to a status code and body.
    ///
    /// The run gets its own task: a timeout aborts it and a panic inside it
    /// becomes an internal error instead of taking the caller down.
    pub async fn invoke(&self, request: SubmissionRequest) -> InvocationOutcome {
        let invocation_id = Uuid::new_v4();
        let orchestrator = self.clone();
        let mut task = tokio::spawn(async move { orchestrator.run(invocation_id, request).await });

        let joined = match self.settings.invocation_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    return outcome_for(invocation_id, Err(RelayError::TimedOut(limit)));
                }
            },
            None => task.await,
        };

        let result = joined.unwrap_or_else(|e| {
            Err(RelayError::Internal(format!("invocation task failed: {}", e)))
        });
        outcome_for(invocation_id, result)
    }

    async fn run(
        &self,
        invocation_id: Uuid,
        request: SubmissionRequest,
    ) -> Result<InvocationReport, RelayError> {
        let span = tracing::info_span!("invocation", invocation_id = %invocation_id);
        self.run_steps(invocation_id, request).instrument(span).await
    }

    async fn run_steps(
        &self,
        invocation_id: Uuid,
        request: SubmissionRequest,
    ) -> Result<InvocationReport, RelayError> {
        let start = Instant::now();
        let mut tracker = StateTracker::new();

        if let Err(e) = request.ensure_valid() {
            tracker.advance(InvocationState::Failed);
            return Err(e);
        }
        let recipient = request.recipient_address.as_str();

        tracker.advance(InvocationState::Validating);
        let validation = self.validate_source(&request.source_url).await;
        let destination = if validation.is_valid {
            self.plan_destination(&request.source_url)
        } else {
            None
        };
        let transfer_state = if validation.is_valid {
            InvocationState::Transferring
        } else {
            InvocationState::Skipped
        };

        let (result, notification_sent, record_written) = match self.settings.policy.notify_order
        {
            NotifyOrder::AfterTransfer => {
                tracker.advance(transfer_state);
                let result = self.build_result(&validation, destination.as_ref()).await;

                tracker.advance(InvocationState::Notifying);
                let (sent, written) = self.notify_and_record(&result, recipient).await;
                tracker.mark(InvocationState::Recording);
                (result, sent, written)
            }
            NotifyOrder::BeforeTransfer => {
                let announced = if !validation.is_valid {
                    TransferResult::failure(validation.reason.message())
                } else {
                    match destination.as_ref() {
                        Some(d) => {
                            TransferResult::planned(self.collaborators.storage.public_url(&d.key))
                        }
                        None => TransferResult::failure(TRANSFER_FAILED_DETAIL),
                    }
                };

                tracker.advance(InvocationState::Notifying);
                let sent = self.notify(&announced, recipient).await;

                tracker.advance(transfer_state);
                let result = self.build_result(&validation, destination.as_ref()).await;
                if announced.succeeded() && !result.succeeded() {
                    tracing::warn!("Transfer failed after the recipient was told it would succeed");
                }

                tracker.advance(InvocationState::Recording);
                let written = self.record(&result, recipient).await;
                (result, sent, written)
            }
        };

        tracker.advance(InvocationState::Done);
        tracing::info!(
            succeeded = result.succeeded(),
            reason = validation.reason.as_str(),
            notification_sent,
            record_written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Invocation complete"
        );

        Ok(InvocationReport {
            invocation_id,
            state: InvocationState::Done,
            result,
            notification_sent,
            record_written,
        })
    }
}

/// Trigger-facing outcome of one invocation.
pub fn outcome_for(
    invocation_id: Uuid,
    result: Result<InvocationReport, RelayError>,
) -> InvocationOutcome {
    match result {
        Ok(report) => InvocationOutcome {
            status_code: report.status_code(),
            body: json!({
                "message": "Submission processed",
                "invocationId": report.invocation_id,
                "succeeded": report.result.succeeded(),
                "bytesTransferred": report.result.bytes_transferred(),
                "notificationSent": report.notification_sent,
                "recordWritten": report.record_written,
            }),
        },
        Err(err) => {
            log_relay_error(invocation_id, &err);
            InvocationOutcome {
                status_code: err.http_status_code(),
                body: json!({
                    "message": err.client_message(),
                    "error": err.error_code(),
                    "invocationId": invocation_id,
                }),
            }
        }
    }
}

fn log_relay_error(invocation_id: Uuid, err: &RelayError) {
    let details = err.detailed_message();
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(
            invocation_id = %invocation_id,
            error_code = err.error_code(),
            error = %details,
            "Invocation failed"
        ),
        LogLevel::Warn => tracing::warn!(
            invocation_id = %invocation_id,
            error_code = err.error_code(),
            error = %details,
            "Invocation failed"
        ),
        LogLevel::Error => tracing::error!(
            invocation_id = %invocation_id,
            error_code = err.error_code(),
            error_type = err.error_type(),
            error = %details,
            "Invocation failed"
        ),
    }
}
