//! Source validation: cheap syntactic checks first, then a HEAD probe.
//!
//! Every failure, network errors included, becomes a [`ValidationOutcome`]
//! with `is_valid = false`. Nothing here returns an error.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::time::Duration;

use ziprelay_core::config::SourceConfig;
use ziprelay_core::models::{ValidationOutcome, ValidationReason};

use super::ssrf::{check_source_host, HostRejection};

const ZIP_EXTENSION: &str = ".zip";

#[derive(Clone)]
pub struct SourceValidator {
    client: Client,
    accepted_content_types: Vec<String>,
    probe_timeout: Duration,
    allow_private_sources: bool,
    host_allowlist: Option<Vec<String>>,
}

impl SourceValidator {
    pub fn new(client: Client, config: &SourceConfig) -> Self {
        Self {
            client,
            accepted_content_types: config
                .accepted_content_types
                .iter()
                .map(|ct| normalize_content_type(ct))
                .collect(),
            probe_timeout: config.probe_timeout,
            allow_private_sources: config.allow_private_sources,
            host_allowlist: config.host_allowlist.clone(),
        }
    }

    #[tracing::instrument(skip(self, url), fields(source_url = %url))]
    pub async fn validate(&self, url: &str) -> ValidationOutcome {
        let parsed = match parse_zip_url(url) {
            Ok(parsed) => parsed,
            Err(reason) => {
                tracing::info!(reason = reason.as_str(), "Source rejected without probing");
                return ValidationOutcome::rejected(reason);
            }
        };

        if let Err(rejection) = check_source_host(
            &parsed,
            self.allow_private_sources,
            self.host_allowlist.as_deref(),
        )
        .await
        {
            let reason = match rejection {
                HostRejection::Forbidden(detail) => {
                    tracing::warn!(detail = %detail, "Source host is not allowed");
                    ValidationReason::ForbiddenHost
                }
                HostRejection::Unresolvable(detail) => {
                    tracing::info!(detail = %detail, "Source host could not be resolved");
                    ValidationReason::Unreachable
                }
            };
            return ValidationOutcome::rejected(reason);
        }

        self.probe(parsed).await
    }

    async fn probe(&self, url: Url) -> ValidationOutcome {
        let response = match self
            .client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::info!(error = %e, "HEAD probe failed");
                return ValidationOutcome::rejected(ValidationReason::Unreachable);
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::info!(status = status.as_u16(), "HEAD probe returned non-success status");
            return ValidationOutcome::rejected(ValidationReason::Unreachable);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(normalize_content_type);

        match content_type {
            Some(ct) if self.accepted_content_types.contains(&ct) => {
                tracing::debug!(content_type = %ct, "Source advertises an accepted content type");
                ValidationOutcome::valid()
            }
            other => {
                tracing::info!(
                    content_type = other.as_deref().unwrap_or("<none>"),
                    "Source advertises an unaccepted content type"
                );
                ValidationOutcome::rejected(ValidationReason::WrongContentType)
            }
        }
    }
}

/// Parse `url` and require an http(s) scheme and a `.zip` path.
pub fn parse_zip_url(url: &str) -> Result<Url, ValidationReason> {
    let parsed = Url::parse(url.trim()).map_err(|_| ValidationReason::InvalidUrl)?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ValidationReason::InvalidUrl);
    }

    if !parsed.path().to_lowercase().ends_with(ZIP_EXTENSION) {
        return Err(ValidationReason::NotZipExtension);
    }

    Ok(parsed)
}

/// `Application/ZIP; charset=binary` -> `application/zip`
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> SourceValidator {
        let config = SourceConfig {
            accepted_content_types: vec![
                "application/zip".to_string(),
                "application/x-zip-compressed".to_string(),
            ],
            probe_timeout: Duration::from_secs(5),
            // mockito listens on 127.0.0.1
            allow_private_sources: true,
            host_allowlist: None,
        };
        SourceValidator::new(Client::new(), &config)
    }

    #[test]
    fn syntactic_checks() {
        assert_eq!(
            parse_zip_url("https://host/archive.tar.gz").unwrap_err(),
            ValidationReason::NotZipExtension
        );
        assert_eq!(
            parse_zip_url("ftp://host/archive.zip").unwrap_err(),
            ValidationReason::InvalidUrl
        );
        assert_eq!(
            parse_zip_url("not a url").unwrap_err(),
            ValidationReason::InvalidUrl
        );
        assert!(parse_zip_url("https://host/Archive.ZIP?sig=abc").is_ok());
    }

    #[test]
    fn normalizes_content_type() {
        assert_eq!(
            normalize_content_type("Application/Zip; charset=binary"),
            "application/zip"
        );
    }

    #[tokio::test]
    async fn non_zip_extension_is_rejected_without_probe() {
        let mut server = mockito::Server::new_async().await;
        let head = server
            .mock("HEAD", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let outcome = validator()
            .validate(&format!("{}/archive.tar.gz", server.url()))
            .await;

        assert!(!outcome.is_valid);
        assert_eq!(outcome.reason, ValidationReason::NotZipExtension);
        head.assert_async().await;
    }

    #[tokio::test]
    async fn accepted_content_types_pass() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/a.zip")
            .with_status(200)
            .with_header("content-type", "application/zip")
            .create_async()
            .await;
        server
            .mock("HEAD", "/b.zip")
            .with_status(200)
            .with_header("content-type", "application/x-zip-compressed")
            .create_async()
            .await;

        let validator = validator();
        let a = validator.validate(&format!("{}/a.zip", server.url())).await;
        let b = validator.validate(&format!("{}/b.zip", server.url())).await;
        assert_eq!(a, ValidationOutcome::valid());
        assert_eq!(b, ValidationOutcome::valid());
    }

    #[tokio::test]
    async fn wrong_or_missing_content_type_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/page.zip")
            .with_status(200)
            .with_header("content-type", "text/html")
            .create_async()
            .await;

        let outcome = validator()
            .validate(&format!("{}/page.zip", server.url()))
            .await;
        assert_eq!(outcome.reason, ValidationReason::WrongContentType);
    }

    #[tokio::test]
    async fn error_status_counts_as_unreachable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/gone.zip")
            .with_status(404)
            .create_async()
            .await;

        let outcome = validator()
            .validate(&format!("{}/gone.zip", server.url()))
            .await;
        assert_eq!(outcome.reason, ValidationReason::Unreachable);
    }

    #[tokio::test]
    async fn connection_failure_counts_as_unreachable() {
        // Nothing listens on port 9 (discard) in the test environment
        let outcome = validator().validate("http://127.0.0.1:9/a.zip").await;
        assert!(!outcome.is_valid);
        assert_eq!(outcome.reason, ValidationReason::Unreachable);
    }

    #[tokio::test]
    async fn private_hosts_are_forbidden_by_default() {
        let config = SourceConfig {
            accepted_content_types: vec!["application/zip".to_string()],
            probe_timeout: Duration::from_secs(1),
            allow_private_sources: false,
            host_allowlist: None,
        };
        let outcome = SourceValidator::new(Client::new(), &config)
            .validate("http://127.0.0.1/a.zip")
            .await;
        assert_eq!(outcome.reason, ValidationReason::ForbiddenHost);
    }
}
