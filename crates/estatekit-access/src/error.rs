//! Delegate access error types.

use estatekit_core::error::EstateKitError;
use estatekit_core::models::delegate::DelegateStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Invalid delegate email")]
    InvalidEmail,

    #[error("Invalid permissions for role")]
    InvalidPermissions,

    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: DelegateStatus,
        to: DelegateStatus,
    },

    #[error("delegate is expired or revoked and cannot be updated")]
    DelegateClosed,
}

impl From<AccessError> for EstateKitError {
    fn from(err: AccessError) -> Self {
        EstateKitError::Validation {
            message: err.to_string(),
        }
    }
}
