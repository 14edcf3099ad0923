//! Error types for the Estate Kit system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EstateKitError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Dependency timed out: {dependency}")]
    DependencyTimeout { dependency: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type EstateKitResult<T> = Result<T, EstateKitError>;
