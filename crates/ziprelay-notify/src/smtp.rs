//! Notification delivery over SMTP.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::info;

use ziprelay_core::config::NotifierConfig;

use crate::{Notifier, NotifyError};

#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn from_config(config: &NotifierConfig) -> Result<Self, NotifyError> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| NotifyError::Configuration("SMTP_HOST must be set".to_string()))?;
        let from: Mailbox = config
            .mail_from
            .parse()
            .map_err(|e| NotifyError::Configuration(format!("Invalid MAIL_FROM: {}", e)))?;
        let port = config.smtp_port;
        let credentials = match (&config.smtp_user, &config.smtp_password) {
            (Some(u), Some(p)) => Some(Credentials::new(u.clone(), p.clone())),
            _ => None,
        };

        let mailer = if config.smtp_tls {
            let b = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| NotifyError::Configuration(e.to_string()))?
                .port(port);
            let b = match credentials {
                Some(c) => b.credentials(c),
                None => b,
            };
            info!(
                host = %host,
                port = port,
                "Notifier initialized (SMTP with STARTTLS)"
            );
            b.build()
        } else {
            let b = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);
            let b = match credentials {
                Some(c) => b.credentials(c),
                None => b,
            };
            info!(host = %host, port = port, "Notifier initialized (SMTP)");
            b.build()
        };

        Ok(Self {
            mailer: Arc::new(mailer),
            from,
        })
    }
}

/// Plain-text message from `from` to a single recipient.
pub(crate) fn build_message(
    from: &Mailbox,
    to: &str,
    subject: &str,
    body: &str,
) -> Result<Message, NotifyError> {
    let to: Mailbox = to
        .parse()
        .map_err(|_| NotifyError::InvalidAddress(to.to_string()))?;

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| NotifyError::Build(e.to_string()))
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let email = build_message(&self.from, to, subject, body)?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        info!(transport = "smtp", "Notification email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from() -> Mailbox {
        "Relay <relay@example.com>".parse().unwrap()
    }

    #[test]
    fn builds_plain_text_message() {
        let message = build_message(&from(), "a@b.com", "Posted Submission", "hello").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Posted Submission"));
        assert!(raw.contains("To: a@b.com"));
        assert!(raw.contains("hello"));
    }

    #[test]
    fn rejects_invalid_recipient() {
        assert!(matches!(
            build_message(&from(), "not an address", "s", "b"),
            Err(NotifyError::InvalidAddress(_))
        ));
    }
}
