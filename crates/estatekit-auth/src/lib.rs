//! Estate Kit Auth — credential verification, device-fingerprint-bound
//! sessions, and concurrent-session cap enforcement.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod service;
pub mod token;

pub use config::SessionConfig;
pub use error::SessionError;
pub use identity::{IdentityProvider, JwtIdentityProvider, TokenIntrospection};
pub use service::{
    AuthenticateInput, AuthenticateOutput, SecurityContext, SessionService, SessionValidation,
};
