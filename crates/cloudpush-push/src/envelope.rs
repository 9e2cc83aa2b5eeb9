//! The JSON error envelope returned before a push stream starts.
//!
//! ```text
//! {
//!   "code": "Unauthorized",
//!   "message": "authentication failed"
//! }
//! ```

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// Body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// `"ok"` for success, otherwise the status reason phrase.
    pub code: String,
    pub message: String,
}

impl ErrorEnvelope {
    /// Envelope for an error answered with `status`.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: message.into(),
        }
    }

    /// The envelope for "no error".
    pub fn ok() -> Self {
        Self {
            code: "ok".to_string(),
            message: String::new(),
        }
    }
}

/// Render an envelope as a pretty-printed JSON response.
pub fn envelope_response(status: StatusCode, envelope: &ErrorEnvelope) -> Response {
    let mut body = serde_json::to_vec_pretty(envelope).unwrap_or_default();
    body.push(b'\n');

    (
        status,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
        ],
        body,
    )
        .into_response()
}

/// A `200 OK` response carrying the `"ok"` envelope.
pub fn ok_response() -> Response {
    envelope_response(StatusCode::OK, &ErrorEnvelope::ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_error_envelope() {
        let response = envelope_response(
            StatusCode::NOT_ACCEPTABLE,
            &ErrorEnvelope::new(StatusCode::NOT_ACCEPTABLE, "requested versions: 2"),
        );
        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            "{\n  \"code\": \"Not Acceptable\",\n  \"message\": \"requested versions: 2\"\n}\n"
        );
    }

    #[tokio::test]
    async fn test_ok_envelope() {
        let response = ok_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let envelope: ErrorEnvelope = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope, ErrorEnvelope::ok());
    }
}
