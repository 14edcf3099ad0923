//! Session manager error types.

use estatekit_core::error::EstateKitError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("credential has expired")]
    TokenExpired,

    #[error("invalid credential: {0}")]
    TokenInvalid(String),

    #[error("identity provider failure: {0}")]
    ProviderUnavailable(String),

    #[error("dependency timed out: {dependency}")]
    Timeout { dependency: String },

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<SessionError> for EstateKitError {
    fn from(err: SessionError) -> Self {
        match err {
            // Credential problems collapse to a generic signal so the
            // caller learns nothing useful for credential probing.
            SessionError::InvalidCredentials
            | SessionError::TokenExpired
            | SessionError::TokenInvalid(_)
            | SessionError::ProviderUnavailable(_) => EstateKitError::AuthenticationFailed {
                reason: "authentication failed".into(),
            },
            SessionError::Timeout { dependency } => EstateKitError::DependencyTimeout { dependency },
            SessionError::Crypto(msg) => EstateKitError::Internal(msg),
        }
    }
}
