//! Helpers for the one-shot invoker.

use anyhow::Context;
use std::path::Path;
use ziprelay_core::models::SubmissionRequest;
use ziprelay_core::{LogFormat, TriggerEnvelope};

/// Where the single submission comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Direct { url: String, to: String },
    EventFile(std::path::PathBuf),
}

/// Decode the trigger into a submission.
///
/// Returns `None` for SNS subscription confirmations, which carry no submission.
pub fn load_submission(trigger: &Trigger) -> anyhow::Result<Option<SubmissionRequest>> {
    match trigger {
        Trigger::Direct { url, to } => Ok(Some(SubmissionRequest::new(url.as_str(), to.as_str()))),
        Trigger::EventFile(path) => read_event_file(path),
    }
}

fn read_event_file(path: &Path) -> anyhow::Result<Option<SubmissionRequest>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file {}", path.display()))?;
    let envelope = TriggerEnvelope::from_sns_event(&raw)
        .with_context(|| format!("Event file {} is not a valid trigger", path.display()))?;
    Ok(envelope
        .into_submission()
        .map(|r| SubmissionRequest::new(r.source_url, r.recipient_address)))
}

/// Process exit code for an invocation status code: 0 for DONE, 1 for FAILED.
pub fn exit_code(status_code: u16) -> i32 {
    if (200..300).contains(&status_code) {
        0
    } else {
        1
    }
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout carries only the outcome body.
pub fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ziprelay=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.compact().init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn direct_trigger_trims_inputs() {
        let request = load_submission(&Trigger::Direct {
            url: " https://host/a.zip ".to_string(),
            to: "a@b.com ".to_string(),
        })
        .unwrap()
        .unwrap();
        assert_eq!(request.source_url, "https://host/a.zip");
        assert_eq!(request.recipient_address, "a@b.com");
    }

    #[test]
    fn reads_lambda_event_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let message = r#"{"sourceUrl":"https://host/a.zip","recipientAddress":"a@b.com"}"#;
        let event = serde_json::json!({ "Records": [{ "Sns": { "Message": message } }] });
        write!(file, "{}", event).unwrap();

        let request = load_submission(&Trigger::EventFile(file.path().to_path_buf()))
            .unwrap()
            .unwrap();
        assert_eq!(request.source_url, "https://host/a.zip");
    }

    #[test]
    fn subscription_confirmation_has_no_submission() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"Type":"SubscriptionConfirmation","TopicArn":"arn:aws:sns:us-east-1:1:t"}}"#
        )
        .unwrap();

        let request = load_submission(&Trigger::EventFile(file.path().to_path_buf())).unwrap();
        assert!(request.is_none());
    }

    #[test]
    fn missing_or_malformed_event_file_is_an_error() {
        assert!(load_submission(&Trigger::EventFile("/nonexistent/event.json".into())).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(load_submission(&Trigger::EventFile(file.path().to_path_buf())).is_err());
    }

    #[test]
    fn exit_code_mirrors_status() {
        assert_eq!(exit_code(200), 0);
        assert_eq!(exit_code(500), 1);
    }
}
