//! Error types for request authentication.

use thiserror::Error;

/// Errors that can occur while signing or verifying a request.
///
/// Unknown key ids and signature mismatches both surface as
/// [`AuthError::AuthenticationFailed`] so a caller probing the verifier
/// cannot learn which key ids exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no authorization header provided")]
    NoAuthorizationHeader,

    #[error("no date header or invalid format provided")]
    NoDateHeader,

    #[error("authentication expired")]
    AuthenticationExpired,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("payload encoding error: {0}")]
    Encoding(String),

    #[error("duplicate key id {0} in key registry")]
    DuplicateKeyId(u32),
}

impl AuthError {
    /// Whether this error came from the authentication checks themselves,
    /// as opposed to a local encoding or configuration problem.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, AuthError::Encoding(_) | AuthError::DuplicateKeyId(_))
    }
}

/// Result type for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
