//! ZipRelay Notification Library
//!
//! Delivers the single status message each invocation sends to its recipient,
//! over SMTP or the Mailgun HTTP API.

use async_trait::async_trait;
use std::sync::Arc;

use ziprelay_core::{Config, NotifierKind};

pub mod mailgun;
pub mod smtp;

pub use mailgun::MailgunNotifier;
pub use smtp::SmtpNotifier;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Invalid recipient address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rejected by provider with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Notifier configuration error: {0}")]
    Configuration(String),
}

/// Notification transport
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Create the notifier selected by configuration
pub fn create_notifier(config: &Config) -> Result<Arc<dyn Notifier>, NotifyError> {
    let settings = config.notifier();
    match settings.kind {
        NotifierKind::Smtp => Ok(Arc::new(SmtpNotifier::from_config(settings)?)),
        NotifierKind::Mailgun => {
            let api_key = settings.mailgun_api_key.clone().ok_or_else(|| {
                NotifyError::Configuration("MAILGUN_API_KEY must be set".to_string())
            })?;
            let domain = settings.mailgun_domain.as_deref().ok_or_else(|| {
                NotifyError::Configuration("MAILGUN_DOMAIN must be set".to_string())
            })?;
            let notifier = MailgunNotifier::new(
                &settings.mailgun_base_url,
                domain,
                api_key,
                settings.mail_from.clone(),
            )?;
            tracing::info!(domain = %domain, "Notifier initialized (Mailgun)");
            Ok(Arc::new(notifier))
        }
    }
}
