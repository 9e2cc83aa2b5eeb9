//! Error types for push delivery.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cloudpush_client::ClientError;
use thiserror::Error;

use crate::envelope::{envelope_response, ErrorEnvelope};

/// Message sent for every authentication failure, whatever the cause.
const UNAUTHORIZED_MESSAGE: &str = "authentication failed";

/// Errors that can occur handling a push.
#[derive(Debug, Error)]
pub enum PushError {
    /// The push failed signature, expiry or body-hash checks.
    #[error("push rejected: {0}")]
    Unauthorized(#[source] ClientError),

    /// The body could not be decoded.
    #[error("malformed push: {0}")]
    BadRequest(String),

    /// None of the push protocol versions the peer accepts are supported.
    #[error("requested versions: {}", .requested.join(", "))]
    UnsupportedVersion { requested: Vec<String> },

    /// The receiver callback returned an error or panicked.
    #[error("{0}")]
    CallbackFailure(String),

    /// The peer did not hang up after the terminal event.
    #[error("push connection was not closed by the peer within {0:?} of the terminal event")]
    DeliveryConfirmationTimeout(Duration),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PushError {
    pub fn status(&self) -> StatusCode {
        match self {
            PushError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            PushError::BadRequest(_) => StatusCode::BAD_REQUEST,
            PushError::UnsupportedVersion { .. } => StatusCode::NOT_ACCEPTABLE,
            PushError::CallbackFailure(_)
            | PushError::DeliveryConfirmationTimeout(_)
            | PushError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ClientError> for PushError {
    fn from(err: ClientError) -> Self {
        match err {
            err if err.is_auth_rejection() => PushError::Unauthorized(err),
            ClientError::Decode(reason) => PushError::BadRequest(reason),
            other => PushError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for PushError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            PushError::Unauthorized(_) => UNAUTHORIZED_MESSAGE.to_string(),
            other => other.to_string(),
        };
        envelope_response(status, &ErrorEnvelope::new(status, message))
    }
}

/// Result type for push operations.
pub type Result<T> = std::result::Result<T, PushError>;
