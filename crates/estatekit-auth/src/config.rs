//! Session manager configuration.

/// Configuration for the session manager.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session lifetime in seconds (default: 86_400 = 24 hours).
    pub session_ttl_secs: u64,
    /// Concurrent-session cap per user (default: 3). The oldest-created
    /// session is evicted when a new one would exceed this.
    pub max_sessions_per_user: usize,
    /// Bound on every identity-provider and store call, in seconds
    /// (default: 5). Elapse surfaces as a dependency-timeout failure.
    pub dependency_timeout_secs: u64,
    /// PEM-encoded Ed25519 public key for credential verification.
    pub jwt_public_key_pem: String,
    /// Expected JWT issuer (`iss` claim).
    pub jwt_issuer: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 86_400,
            max_sessions_per_user: 3,
            dependency_timeout_secs: 5,
            jwt_public_key_pem: String::new(),
            jwt_issuer: "estatekit".into(),
        }
    }
}
