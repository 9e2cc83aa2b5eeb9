//! Error types for the SDK.

use cloudpush_auth::AuthError;
use cloudpush_client::ClientError;
use thiserror::Error;

/// Errors that can occur using the SDK.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Key handling error.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Error talking to the control plane.
    #[error("client error: {0}")]
    Client(#[from] ClientError),
}

/// Result type for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;
