//! Identity provider interface.
//!
//! The session manager never inspects credentials itself beyond
//! delegating to this collaborator. Failure of either operation
//! propagates as an authentication failure.

use chrono::{DateTime, TimeZone, Utc};
use estatekit_core::error::EstateKitError;
use estatekit_core::models::user::UserProfile;
use estatekit_core::repository::UserRepository;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::token;

/// Result of verifying a bearer credential.
#[derive(Debug, Clone)]
pub struct TokenIntrospection {
    pub subject: String,
    pub expires_at: DateTime<Utc>,
}

/// External identity provider: credential verification plus canonical
/// profile lookup.
pub trait IdentityProvider: Send + Sync {
    fn verify_token(
        &self,
        credential: &str,
    ) -> impl Future<Output = Result<TokenIntrospection, SessionError>> + Send;
    fn get_user_info(
        &self,
        subject: &str,
    ) -> impl Future<Output = Result<UserProfile, SessionError>> + Send;
}

/// Identity provider backed by EdDSA JWT verification and a local
/// profile directory.
pub struct JwtIdentityProvider<R: UserRepository> {
    users: R,
    config: SessionConfig,
}

impl<R: UserRepository> JwtIdentityProvider<R> {
    pub fn new(users: R, config: SessionConfig) -> Self {
        Self { users, config }
    }
}

impl<R: UserRepository> IdentityProvider for JwtIdentityProvider<R> {
    async fn verify_token(&self, credential: &str) -> Result<TokenIntrospection, SessionError> {
        let claims = token::decode_access_token(credential, &self.config)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| SessionError::TokenInvalid("exp out of range".into()))?;
        Ok(TokenIntrospection {
            subject: claims.sub,
            expires_at,
        })
    }

    async fn get_user_info(&self, subject: &str) -> Result<UserProfile, SessionError> {
        self.users.get_by_subject(subject).await.map_err(|e| match e {
            EstateKitError::NotFound { .. } => SessionError::InvalidCredentials,
            other => SessionError::ProviderUnavailable(other.to_string()),
        })
    }
}
