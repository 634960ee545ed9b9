//! Notification delivery through the Mailgun HTTP API.

use async_trait::async_trait;
use std::time::Duration;

use crate::{Notifier, NotifyError};

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct MailgunNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl MailgunNotifier {
    /// `base_url` is the API root, e.g. `https://api.mailgun.net`.
    pub fn new(
        base_url: &str,
        domain: &str,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| NotifyError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/v3/{}/messages", base_url.trim_end_matches('/'), domain),
            api_key: api_key.into(),
            from: from.into(),
        })
    }
}

#[async_trait]
impl Notifier for MailgunNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        if to.trim().is_empty() {
            return Err(NotifyError::InvalidAddress(to.to_string()));
        }

        let form = [
            ("from", self.from.as_str()),
            ("to", to),
            ("subject", subject),
            ("text", body),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(transport = "mailgun", "Notification email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn posts_form_with_basic_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v3/mg.example.com/messages")
            // base64("api:key-123")
            .match_header("authorization", "Basic YXBpOmtleS0xMjM=")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("to".into(), "a@b.com".into()),
                Matcher::UrlEncoded("subject".into(), "Posted Submission".into()),
                Matcher::UrlEncoded("text".into(), "hello".into()),
                Matcher::UrlEncoded("from".into(), "relay@example.com".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"id":"<1@mg>","message":"Queued. Thank you."}"#)
            .create_async()
            .await;

        let notifier =
            MailgunNotifier::new(&server.url(), "mg.example.com", "key-123", "relay@example.com")
                .unwrap();
        notifier
            .send("a@b.com", "Posted Submission", "hello")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn surfaces_api_rejection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v3/mg.example.com/messages")
            .with_status(401)
            .with_body("Forbidden")
            .create_async()
            .await;

        let notifier =
            MailgunNotifier::new(&server.url(), "mg.example.com", "bad", "relay@example.com")
                .unwrap();
        let err = notifier.send("a@b.com", "s", "b").await.unwrap_err();

        match err {
            NotifyError::Rejected { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "Forbidden");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
