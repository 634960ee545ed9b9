//! HTTP error responses for malformed triggers
//!
//! Only envelope problems surface here. Once a submission is decoded the
//! orchestrator owns the outcome and always answers with its own body.

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use ziprelay_core::EnvelopeError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
}

/// Rejections raised before an invocation starts. Always a 400.
#[derive(Debug, thiserror::Error)]
pub enum HttpAppError {
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Invalid trigger envelope: {0}")]
    Envelope(#[from] EnvelopeError),
}

impl HttpAppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            HttpAppError::InvalidBody(_) => "INVALID_BODY",
            HttpAppError::Envelope(_) => "INVALID_ENVELOPE",
        }
    }
}

impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError::InvalidBody(rejection.body_text())
    }
}

/// JSON body extractor that answers with [`ErrorResponse`] instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, code = self.error_code(), "Rejected trigger");

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.error_code().to_string(),
        });
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}
