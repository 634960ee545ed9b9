//! Everything that touches the origin: host checks, the HEAD probe and the
//! streaming download.

pub mod fetch;
pub mod ssrf;
pub mod validation;

pub use fetch::open_source_stream;
pub use validation::{normalize_content_type, parse_zip_url, SourceValidator};

use reqwest::redirect::{Attempt, Policy};
use reqwest::Client;
use ziprelay_core::config::SourceConfig;

const MAX_REDIRECTS: usize = 5;

/// HTTP client used for probing and downloading sources.
///
/// Redirect targets get the DNS-free host check; a redirect to an internal
/// address stops the request.
pub fn build_http_client(config: &SourceConfig) -> reqwest::Result<Client> {
    let allow_private = config.allow_private_sources;
    let policy = Policy::custom(move |attempt: Attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let internal = attempt
            .url()
            .host_str()
            .map(|host| {
                let host = host.trim_start_matches('[').trim_end_matches(']');
                ssrf::is_internal_host_literal(&host.to_lowercase())
            })
            .unwrap_or(true);
        if internal && !allow_private {
            return attempt.stop();
        }
        attempt.follow()
    });

    Client::builder()
        .connect_timeout(config.probe_timeout)
        .redirect(policy)
        .build()
}
