//! Configuration module
//!
//! Process configuration is read once at start-up and validated before any
//! invocation runs. Missing store, table or transport settings produce a
//! [`ConfigError`], which is fatal and distinct from a per-invocation failure.
//!
//! Parsing goes through [`Config::from_lookup`] so tests can supply values
//! without touching the process environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use regex::Regex;

use crate::policy::{NotifyOrder, RecordKeyStrategy, RelayPolicy, DEFAULT_STORED_CONTENT_TYPE};
use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 4000;
const DB_MAX_CONNECTIONS: u32 = 5;
const DB_TIMEOUT_SECS: u64 = 30;
const PROBE_TIMEOUT_SECS: u64 = 10;
const TRANSFER_PART_SIZE_MB: usize = 8;
const MIN_TRANSFER_PART_SIZE_MB: usize = 5;
const SMTP_PORT: u16 = 587;
const DEFAULT_STATUS_TABLE: &str = "status_records";
const DEFAULT_KEY_PREFIX: &str = "submissions";
const DEFAULT_SUBJECT: &str = "Posted Submission";
const DEFAULT_ACCEPTED_CONTENT_TYPES: &str = "application/zip,application/x-zip-compressed";
const DEFAULT_MAILGUN_BASE_URL: &str = "https://api.mailgun.net";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierKind {
    Smtp,
    Mailgun,
}

/// Base configuration shared by the server and the one-shot invoker
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
    pub log_format: LogFormat,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO etc.)
    pub s3_public_acl: bool,
    pub key_prefix: String,
    pub part_size_bytes: usize,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_seconds: u64,
    pub status_table: String,
}

#[derive(Clone, Debug)]
pub struct NotifierConfig {
    pub kind: NotifierKind,
    pub mail_from: String,
    pub subject: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_tls: bool,
    pub mailgun_api_key: Option<String>,
    pub mailgun_domain: Option<String>,
    pub mailgun_base_url: String,
}

/// Settings for probing and fetching the origin.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    pub accepted_content_types: Vec<String>,
    pub probe_timeout: Duration,
    pub allow_private_sources: bool,
    // If set, only origins on these domains (or their subdomains) are fetched
    pub host_allowlist: Option<Vec<String>>,
}

#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub base: BaseConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub notifier: NotifierConfig,
    pub source: SourceConfig,
    pub policy: RelayPolicy,
    pub invocation_timeout: Option<Duration>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<RelayConfig>);

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = RelayConfig::from_lookup(&lookup)?;
        config.validate()?;
        Ok(Config(Box::new(config)))
    }

    fn as_relay(&self) -> &RelayConfig {
        &self.0
    }

    pub fn server_port(&self) -> u16 {
        self.as_relay().base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.as_relay().base.environment
    }

    pub fn log_format(&self) -> LogFormat {
        self.as_relay().base.log_format
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.as_relay().storage
    }

    pub fn database(&self) -> &DatabaseConfig {
        &self.as_relay().database
    }

    pub fn notifier(&self) -> &NotifierConfig {
        &self.as_relay().notifier
    }

    pub fn source(&self) -> &SourceConfig {
        &self.as_relay().source
    }

    pub fn policy(&self) -> &RelayPolicy {
        &self.as_relay().policy
    }

    pub fn invocation_timeout(&self) -> Option<Duration> {
        self.as_relay().invocation_timeout
    }
}

/// Non-empty value for `key`.
fn var<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<String> {
    lookup(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parsed value for `key`, or `default` when unset. A value that is set but
/// does not parse is an error.
fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match var(lookup, key) {
        Some(s) => s
            .parse()
            .map_err(|_| ConfigError::invalid(key, format!("cannot parse '{}'", s))),
        None => Ok(default),
    }
}

fn bool_or<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match var(lookup, key) {
        Some(s) => s
            .to_lowercase()
            .parse()
            .map_err(|_| ConfigError::invalid(key, "expected 'true' or 'false'")),
        None => Ok(default),
    }
}

/// Seconds for `key` that must be greater than zero.
fn positive_secs<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    let secs = parse_or(lookup, key, default)?;
    if secs == 0 {
        return Err(ConfigError::invalid(key, "must be greater than zero"));
    }
    Ok(secs)
}

fn csv<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<Vec<String>> {
    var(lookup, key).map(|s| {
        s.split(',')
            .map(|item| item.trim().to_lowercase())
            .filter(|item| !item.is_empty())
            .collect()
    })
}

impl RelayConfig {
    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: &F) -> Result<Self, ConfigError> {
        let environment = var(lookup, "ENVIRONMENT")
            .or_else(|| var(lookup, "APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let server_port = match var(lookup, "PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| ConfigError::invalid("PORT", "must be a valid port number"))?,
            None => SERVER_PORT,
        };

        let log_format = match var(lookup, "LOG_FORMAT").map(|s| s.to_lowercase()) {
            Some(ref f) if f == "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let backend = match var(lookup, "STORAGE_BACKEND") {
            Some(s) => s
                .parse()
                .map_err(|e: String| ConfigError::invalid("STORAGE_BACKEND", e))?,
            None => StorageBackend::S3,
        };

        let storage = StorageConfig {
            backend,
            s3_bucket: var(lookup, "S3_BUCKET"),
            s3_region: var(lookup, "S3_REGION").or_else(|| var(lookup, "AWS_REGION")),
            s3_endpoint: var(lookup, "S3_ENDPOINT"),
            s3_public_acl: bool_or(lookup, "S3_PUBLIC_ACL", true)?,
            key_prefix: var(lookup, "STORAGE_KEY_PREFIX")
                .map(|p| p.trim_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
            part_size_bytes: parse_or(lookup, "TRANSFER_PART_SIZE_MB", TRANSFER_PART_SIZE_MB)?
                .checked_mul(1024 * 1024)
                .ok_or_else(|| ConfigError::invalid("TRANSFER_PART_SIZE_MB", "too large"))?,
            local_storage_path: var(lookup, "LOCAL_STORAGE_PATH"),
            local_storage_base_url: var(lookup, "LOCAL_STORAGE_BASE_URL"),
        };

        let database = DatabaseConfig {
            url: var(lookup, "DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            max_connections: parse_or(lookup, "DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS)?,
            timeout_seconds: positive_secs(lookup, "DB_TIMEOUT_SECONDS", DB_TIMEOUT_SECS)?,
            status_table: var(lookup, "STATUS_TABLE")
                .unwrap_or_else(|| DEFAULT_STATUS_TABLE.to_string()),
        };

        let kind = match var(lookup, "NOTIFIER").map(|s| s.to_lowercase()) {
            None => NotifierKind::Smtp,
            Some(ref k) if k == "smtp" => NotifierKind::Smtp,
            Some(ref k) if k == "mailgun" => NotifierKind::Mailgun,
            Some(other) => {
                return Err(ConfigError::invalid(
                    "NOTIFIER",
                    format!("expected 'smtp' or 'mailgun', got '{}'", other),
                ))
            }
        };

        let notifier = NotifierConfig {
            kind,
            mail_from: var(lookup, "MAIL_FROM")
                .or_else(|| var(lookup, "SMTP_FROM"))
                .ok_or(ConfigError::Missing("MAIL_FROM"))?,
            subject: var(lookup, "NOTIFICATION_SUBJECT")
                .unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            smtp_host: var(lookup, "SMTP_HOST"),
            smtp_port: match parse_or(lookup, "SMTP_PORT", SMTP_PORT)? {
                0 => return Err(ConfigError::invalid("SMTP_PORT", "must not be 0")),
                port => port,
            },
            smtp_user: var(lookup, "SMTP_USER"),
            smtp_password: var(lookup, "SMTP_PASSWORD"),
            smtp_tls: bool_or(lookup, "SMTP_TLS", true)?,
            mailgun_api_key: var(lookup, "MAILGUN_API_KEY"),
            mailgun_domain: var(lookup, "MAILGUN_DOMAIN"),
            mailgun_base_url: var(lookup, "MAILGUN_BASE_URL")
                .unwrap_or_else(|| DEFAULT_MAILGUN_BASE_URL.to_string()),
        };

        let source = SourceConfig {
            accepted_content_types: csv(lookup, "ACCEPTED_CONTENT_TYPES").unwrap_or_else(|| {
                DEFAULT_ACCEPTED_CONTENT_TYPES
                    .split(',')
                    .map(String::from)
                    .collect()
            }),
            probe_timeout: Duration::from_secs(positive_secs(
                lookup,
                "PROBE_TIMEOUT_SECS",
                PROBE_TIMEOUT_SECS,
            )?),
            allow_private_sources: bool_or(lookup, "ALLOW_PRIVATE_SOURCES", false)?,
            host_allowlist: csv(lookup, "SOURCE_HOST_ALLOWLIST"),
        };

        let record_key_strategy = match var(lookup, "RECORD_KEY_STRATEGY") {
            Some(s) => s
                .parse::<RecordKeyStrategy>()
                .map_err(|e| ConfigError::invalid("RECORD_KEY_STRATEGY", e))?,
            None => RecordKeyStrategy::default(),
        };
        let notify_order = match var(lookup, "NOTIFY_ORDER") {
            Some(s) => s
                .parse::<NotifyOrder>()
                .map_err(|e| ConfigError::invalid("NOTIFY_ORDER", e))?,
            None => NotifyOrder::default(),
        };
        let policy = RelayPolicy {
            stored_content_type: var(lookup, "STORED_CONTENT_TYPE")
                .unwrap_or_else(|| DEFAULT_STORED_CONTENT_TYPE.to_string()),
            record_key_strategy,
            notify_order,
        };

        // 0 or unset disables the limit
        let invocation_timeout = Some(parse_or(lookup, "INVOCATION_TIMEOUT_SECS", 0u64)?)
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs);

        Ok(RelayConfig {
            base: BaseConfig {
                server_port,
                environment,
                log_format,
            },
            storage,
            database,
            notifier,
            source,
            policy,
            invocation_timeout,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.storage.backend {
            StorageBackend::S3 => {
                if self.storage.s3_bucket.is_none() {
                    return Err(ConfigError::Missing("S3_BUCKET"));
                }
                if self.storage.s3_region.is_none() {
                    return Err(ConfigError::Missing("S3_REGION or AWS_REGION"));
                }
            }
            StorageBackend::Local => {
                if self.storage.local_storage_path.is_none() {
                    return Err(ConfigError::Missing("LOCAL_STORAGE_PATH"));
                }
                if self.storage.local_storage_base_url.is_none() {
                    return Err(ConfigError::Missing("LOCAL_STORAGE_BASE_URL"));
                }
            }
        }

        if self.storage.part_size_bytes < MIN_TRANSFER_PART_SIZE_MB * 1024 * 1024 {
            return Err(ConfigError::invalid(
                "TRANSFER_PART_SIZE_MB",
                format!("must be at least {}", MIN_TRANSFER_PART_SIZE_MB),
            ));
        }

        if !self.database.url.starts_with("postgres://")
            && !self.database.url.starts_with("postgresql://")
        {
            return Err(ConfigError::invalid(
                "DATABASE_URL",
                "must be a PostgreSQL connection string",
            ));
        }

        if !is_sql_identifier(&self.database.status_table) {
            return Err(ConfigError::invalid(
                "STATUS_TABLE",
                "must be a plain SQL identifier",
            ));
        }

        match self.notifier.kind {
            NotifierKind::Smtp => {
                if self.notifier.smtp_host.is_none() {
                    return Err(ConfigError::Missing("SMTP_HOST"));
                }
                if self.notifier.smtp_user.is_some() != self.notifier.smtp_password.is_some() {
                    return Err(ConfigError::invalid(
                        "SMTP_USER",
                        "SMTP_USER and SMTP_PASSWORD must be set together",
                    ));
                }
            }
            NotifierKind::Mailgun => {
                if self.notifier.mailgun_api_key.is_none() {
                    return Err(ConfigError::Missing("MAILGUN_API_KEY"));
                }
                if self.notifier.mailgun_domain.is_none() {
                    return Err(ConfigError::Missing("MAILGUN_DOMAIN"));
                }
            }
        }

        if self.source.accepted_content_types.is_empty() {
            return Err(ConfigError::invalid(
                "ACCEPTED_CONTENT_TYPES",
                "at least one content type is required",
            ));
        }

        Ok(())
    }
}

/// True for identifiers that can be interpolated into SQL unquoted.
pub fn is_sql_identifier(name: &str) -> bool {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$")
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("STORAGE_BACKEND", "local"),
            ("LOCAL_STORAGE_PATH", "/tmp/ziprelay-test"),
            ("LOCAL_STORAGE_BASE_URL", "http://localhost:4000/files"),
            ("DATABASE_URL", "postgresql://localhost/ziprelay"),
            ("MAIL_FROM", "relay@example.com"),
            ("SMTP_HOST", "smtp.example.com"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_apply_when_optional_values_absent() {
        let config = load(&base_env()).expect("config");
        assert_eq!(config.server_port(), 4000);
        assert_eq!(config.database().status_table, "status_records");
        assert_eq!(config.storage().key_prefix, "submissions");
        assert_eq!(config.notifier().subject, "Posted Submission");
        assert_eq!(
            config.source().accepted_content_types,
            vec!["application/zip", "application/x-zip-compressed"]
        );
        assert_eq!(config.policy(), &RelayPolicy::default());
        assert!(config.invocation_timeout().is_none());
        assert!(!config.source().allow_private_sources);
    }

    #[test]
    fn missing_database_url_is_fatal() {
        let mut env = base_env();
        env.remove("DATABASE_URL");
        assert_eq!(load(&env).unwrap_err(), ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn s3_backend_requires_bucket_and_region() {
        let mut env = base_env();
        env.insert("STORAGE_BACKEND", "s3");
        assert_eq!(load(&env).unwrap_err(), ConfigError::Missing("S3_BUCKET"));

        env.insert("S3_BUCKET", "archives");
        assert!(matches!(load(&env), Err(ConfigError::Missing(_))));

        env.insert("AWS_REGION", "us-east-1");
        let config = load(&env).expect("config");
        assert_eq!(config.storage().s3_region.as_deref(), Some("us-east-1"));
    }

    #[test]
    fn mailgun_requires_credentials() {
        let mut env = base_env();
        env.insert("NOTIFIER", "mailgun");
        assert_eq!(load(&env).unwrap_err(), ConfigError::Missing("MAILGUN_API_KEY"));

        env.insert("MAILGUN_API_KEY", "key-123");
        env.insert("MAILGUN_DOMAIN", "mg.example.com");
        let config = load(&env).expect("config");
        assert_eq!(config.notifier().kind, NotifierKind::Mailgun);
    }

    #[test]
    fn rejects_unsafe_status_table_name() {
        let mut env = base_env();
        env.insert("STATUS_TABLE", "records; DROP TABLE users");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid {
                key: "STATUS_TABLE",
                ..
            })
        ));
    }

    #[test]
    fn parses_policy_knobs() {
        let mut env = base_env();
        env.insert("RECORD_KEY_STRATEGY", "timestamp");
        env.insert("NOTIFY_ORDER", "before");
        env.insert("STORED_CONTENT_TYPE", "application/octet-stream");
        env.insert("INVOCATION_TIMEOUT_SECS", "90");
        let config = load(&env).expect("config");
        assert_eq!(
            config.policy().record_key_strategy,
            RecordKeyStrategy::Timestamp
        );
        assert_eq!(config.policy().notify_order, NotifyOrder::BeforeTransfer);
        assert_eq!(
            config.policy().stored_content_type,
            "application/octet-stream"
        );
        assert_eq!(config.invocation_timeout(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn rejects_small_part_size() {
        let mut env = base_env();
        env.insert("TRANSFER_PART_SIZE_MB", "1");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid {
                key: "TRANSFER_PART_SIZE_MB",
                ..
            })
        ));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        for (key, value) in [
            ("INVOCATION_TIMEOUT_SECS", "abc"),
            ("PROBE_TIMEOUT_SECS", "ten"),
            ("DB_MAX_CONNECTIONS", "-1"),
            ("SMTP_PORT", "smtp"),
            ("ALLOW_PRIVATE_SOURCES", "yes"),
        ] {
            let mut env = base_env();
            env.insert(key, value);
            match load(&env) {
                Err(ConfigError::Invalid { key: rejected, .. }) => assert_eq!(rejected, key),
                other => panic!("{}={} should be rejected, got {:?}", key, value, other),
            }
        }
    }

    #[test]
    fn zero_probe_timeout_is_rejected() {
        let mut env = base_env();
        env.insert("PROBE_TIMEOUT_SECS", "0");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid {
                key: "PROBE_TIMEOUT_SECS",
                ..
            })
        ));
    }

    #[test]
    fn zero_invocation_timeout_disables_the_limit() {
        let mut env = base_env();
        env.insert("INVOCATION_TIMEOUT_SECS", "0");
        assert!(load(&env).expect("config").invocation_timeout().is_none());
    }

    #[test]
    fn oversized_part_size_is_rejected_not_wrapped() {
        let mut env = base_env();
        env.insert("TRANSFER_PART_SIZE_MB", "18014398509481983");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid {
                key: "TRANSFER_PART_SIZE_MB",
                ..
            })
        ));
    }

    #[test]
    fn sql_identifier_check() {
        assert!(is_sql_identifier("status_records"));
        assert!(is_sql_identifier("_t1"));
        assert!(!is_sql_identifier("1table"));
        assert!(!is_sql_identifier("a-b"));
        assert!(!is_sql_identifier(""));
    }
}
