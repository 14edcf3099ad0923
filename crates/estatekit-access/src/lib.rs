//! Estate Kit Access — delegate permission-matrix enforcement with
//! temporal expiry.

pub mod error;
pub mod matrix;
pub mod service;
pub mod validate;

pub use error::AccessError;
pub use matrix::{allowed_grants, is_grant_allowed, validate_permission_matrix};
pub use service::{DelegateInvite, DelegateService, UpdateDelegateInput};
