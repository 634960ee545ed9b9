//! Trigger envelope decoding
//!
//! Submissions arrive wrapped in SNS. Two shapes are understood:
//!
//! * a Lambda-style event, `{"Records":[{"Sns":{"Message":"<json>"}}]}`
//! * an SNS HTTP(S) delivery, `{"Type":"Notification","Message":"<json>"}`
//!
//! In both the `Message` string itself holds a [`SubmissionRequest`]. A bare
//! submission object is accepted too, which keeps manual invocations simple.

use serde::Deserialize;
use serde_json::Value;

use crate::models::SubmissionRequest;

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Envelope is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Envelope is missing {0}")]
    MissingField(&'static str),

    #[error("Message does not hold a submission: {0}")]
    InvalidMessage(#[source] serde_json::Error),

    #[error("Unsupported SNS message type: {0}")]
    UnsupportedType(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEnvelope {
    Submission(SubmissionRequest),
    /// SNS asks the endpoint to confirm the subscription; nothing to relay.
    SubscriptionConfirmation {
        topic_arn: Option<String>,
        subscribe_url: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct LambdaEvent {
    #[serde(rename = "Records")]
    records: Vec<LambdaRecord>,
}

#[derive(Debug, Deserialize)]
struct LambdaRecord {
    #[serde(rename = "Sns")]
    sns: SnsPayload,
}

#[derive(Debug, Deserialize)]
struct SnsPayload {
    #[serde(rename = "Type", default)]
    message_type: Option<String>,
    #[serde(rename = "Message", default)]
    message: Option<String>,
    #[serde(rename = "TopicArn", default)]
    topic_arn: Option<String>,
    #[serde(rename = "SubscribeURL", default)]
    subscribe_url: Option<String>,
}

impl TriggerEnvelope {
    pub fn from_sns_event(json: &str) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_str(json).map_err(EnvelopeError::InvalidJson)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        if value.get("Records").is_some() {
            let event: LambdaEvent =
                serde_json::from_value(value).map_err(EnvelopeError::InvalidJson)?;
            // Lambda delivers SNS one record at a time
            let record = event
                .records
                .into_iter()
                .next()
                .ok_or(EnvelopeError::MissingField("Records[0]"))?;
            return Self::from_sns_payload(record.sns);
        }

        if value.get("Type").is_some() || value.get("Message").is_some() {
            let payload: SnsPayload =
                serde_json::from_value(value).map_err(EnvelopeError::InvalidJson)?;
            return Self::from_sns_payload(payload);
        }

        serde_json::from_value::<SubmissionRequest>(value)
            .map(TriggerEnvelope::Submission)
            .map_err(EnvelopeError::InvalidMessage)
    }

    fn from_sns_payload(payload: SnsPayload) -> Result<Self, EnvelopeError> {
        match payload.message_type.as_deref() {
            None | Some("Notification") => {}
            Some("SubscriptionConfirmation") => {
                return Ok(TriggerEnvelope::SubscriptionConfirmation {
                    topic_arn: payload.topic_arn,
                    subscribe_url: payload.subscribe_url,
                })
            }
            Some(other) => return Err(EnvelopeError::UnsupportedType(other.to_string())),
        }

        let message = payload
            .message
            .ok_or(EnvelopeError::MissingField("Message"))?;
        let request: SubmissionRequest =
            serde_json::from_str(&message).map_err(EnvelopeError::InvalidMessage)?;
        Ok(TriggerEnvelope::Submission(request))
    }

    pub fn into_submission(self) -> Option<SubmissionRequest> {
        match self {
            TriggerEnvelope::Submission(request) => Some(request),
            TriggerEnvelope::SubscriptionConfirmation { .. } => None,
        }
    }
}
