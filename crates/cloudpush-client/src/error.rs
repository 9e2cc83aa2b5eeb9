//! Error types for the client.

use cloudpush_auth::AuthError;
use thiserror::Error;

/// Errors that can occur talking to the control plane.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Signing or verification failed.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The client configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The request could not be delivered or the response not read.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer answered with something other than 200 OK.
    #[error("unexpected response status {status}")]
    UnexpectedStatus { status: u16, body: String },

    /// A body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A request failed local validation before being sent.
    #[error("validation error: {0}")]
    Validation(String),
}

impl ClientError {
    /// Whether this error means the peer failed authentication, rather
    /// than sent a malformed body.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, ClientError::Auth(err) if err.is_rejection())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
