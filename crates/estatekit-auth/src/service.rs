//! Session manager — authentication, validation, revocation, and the
//! periodic expiry sweep.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use estatekit_core::error::{EstateKitError, EstateKitResult};
use estatekit_core::metrics::MetricsSink;
use estatekit_core::models::audit::{AuditEventType, AuditSeverity, CreateAuditLogEntry};
use estatekit_core::models::session::CreateSession;
use estatekit_core::models::user::UserProfile;
use estatekit_core::repository::{AuditLogRepository, SessionRepository};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::fingerprint;
use crate::identity::IdentityProvider;
use crate::token;

/// Input for the authenticate flow.
#[derive(Debug)]
pub struct AuthenticateInput {
    /// Opaque bearer credential presented by the client.
    pub credential: String,
    pub source_ip: String,
    pub user_agent: String,
}

/// Successful authentication result.
#[derive(Debug)]
pub struct AuthenticateOutput {
    pub user: UserProfile,
    /// Opaque session token (also the session record key).
    pub session_id: String,
    /// Session lifetime in seconds.
    pub expires_in: u64,
}

/// Match flags and telemetry reported by every validation, regardless
/// of the overall verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityContext {
    pub device_match: bool,
    pub ip_match: bool,
    /// Current count of active sessions for the session's user.
    pub concurrent: u64,
}

/// Result of validating a presented session.
#[derive(Debug)]
pub struct SessionValidation {
    pub is_valid: bool,
    /// Populated only when the session is valid.
    pub user_id: Option<Uuid>,
    pub security_context: SecurityContext,
}

/// Session manager.
///
/// Generic over its collaborators so the auth layer has no dependency
/// on the database crate. The session store is owned exclusively by
/// this service.
pub struct SessionService<I, S, A, M>
where
    I: IdentityProvider,
    S: SessionRepository,
    A: AuditLogRepository,
    M: MetricsSink,
{
    identity: I,
    sessions: S,
    audit: A,
    metrics: M,
    config: SessionConfig,
    /// Per-user mutual exclusion for the create-then-trim section, so
    /// concurrent logins for one user cannot both skip eviction.
    /// Entries are pruned once no login holds them.
    user_locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl<I, S, A, M> SessionService<I, S, A, M>
where
    I: IdentityProvider,
    S: SessionRepository,
    A: AuditLogRepository,
    M: MetricsSink,
{
    pub fn new(identity: I, sessions: S, audit: A, metrics: M, config: SessionConfig) -> Self {
        Self {
            identity,
            sessions,
            audit,
            metrics,
            config,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Verify a bearer credential, resolve the canonical profile, and
    /// materialize a new fingerprint-bound session.
    ///
    /// Enforces the concurrent-session cap: sessions beyond
    /// `max_sessions_per_user` are evicted oldest-created-first.
    pub async fn authenticate(&self, input: AuthenticateInput) -> EstateKitResult<AuthenticateOutput> {
        if input.credential.trim().is_empty() {
            return Err(SessionError::InvalidCredentials.into());
        }

        // 1. Verify the credential with the identity provider.
        let introspection = self
            .timed("identity-provider", async {
                self.identity
                    .verify_token(&input.credential)
                    .await
                    .map_err(EstateKitError::from)
            })
            .await?;

        // 2. Fetch the canonical user profile.
        let user = self
            .timed("identity-provider", async {
                self.identity
                    .get_user_info(&introspection.subject)
                    .await
                    .map_err(EstateKitError::from)
            })
            .await?;

        // 3. Bind the session to the client context.
        let device_fingerprint =
            fingerprint::device_fingerprint(&input.user_agent, &input.source_ip);
        let session_id = token::generate_session_token();
        let now = Utc::now();
        let expires_at = now + chrono::Duration::seconds(self.config.session_ttl_secs as i64);

        // 4. Create the session and trim to the cap under the per-user
        //    lock (atomic add-then-trim).
        let lock = self.user_lock(user.id);
        {
            let _guard = lock.lock().await;

            self.timed(
                "session-store",
                self.sessions.create(CreateSession {
                    id: session_id.clone(),
                    user_id: user.id,
                    device_fingerprint,
                    ip_address: input.source_ip.clone(),
                    expires_at,
                }),
            )
            .await?;

            let open = self
                .timed("session-store", self.sessions.list_for_user(user.id))
                .await?;
            let cap = self.config.max_sessions_per_user;
            if open.len() > cap {
                // `list_for_user` returns oldest-created first; evict
                // from the front. Creation order, not last access.
                for evicted in &open[..open.len() - cap] {
                    self.timed("session-store", self.sessions.delete(&evicted.id))
                        .await?;
                    self.audit
                        .append(CreateAuditLogEntry {
                            event_type: AuditEventType::SessionEvicted,
                            severity: AuditSeverity::Info,
                            actor_id: user.id,
                            resource_id: Some(evicted.id.clone()),
                            resource_type: Some("session".into()),
                            ip_address: Some(input.source_ip.clone()),
                            user_agent: Some(input.user_agent.clone()),
                            details: json!({ "reason": "concurrent_session_cap" }),
                        })
                        .await?;
                    info!(user_id = %user.id, "Evicted oldest session over concurrency cap");
                    self.metrics.incr("session_evicted");
                }
            }
        }
        drop(lock);
        self.prune_user_lock(user.id);

        // 5. Audit the successful login before returning.
        self.audit
            .append(CreateAuditLogEntry {
                event_type: AuditEventType::UserLogin,
                severity: AuditSeverity::Info,
                actor_id: user.id,
                resource_id: Some(session_id.clone()),
                resource_type: Some("session".into()),
                ip_address: Some(input.source_ip),
                user_agent: Some(input.user_agent),
                details: json!({ "subject": user.subject }),
            })
            .await?;
        self.metrics.incr("user_login");

        Ok(AuthenticateOutput {
            user,
            session_id,
            expires_in: self.config.session_ttl_secs,
        })
    }

    /// Validate a presented session against its stored fingerprint and
    /// source IP.
    ///
    /// Valid only when both match. The security context reports both
    /// match flags and the user's concurrent-session count regardless
    /// of the verdict; an absent or expired session reports a default
    /// context. `last_accessed_at` is refreshed only on success.
    pub async fn validate_session(
        &self,
        session_id: &str,
        source_ip: &str,
        device_fingerprint: &str,
    ) -> EstateKitResult<SessionValidation> {
        let session = match self.timed("session-store", self.sessions.get(session_id)).await {
            Ok(session) => session,
            Err(EstateKitError::NotFound { .. }) => {
                self.audit_validation_failure(Uuid::nil(), session_id, source_ip, "unknown_session")
                    .await?;
                return Ok(SessionValidation {
                    is_valid: false,
                    user_id: None,
                    security_context: SecurityContext::default(),
                });
            }
            Err(e) => return Err(e),
        };

        let now = Utc::now();
        if session.expires_at <= now {
            self.audit_validation_failure(session.user_id, session_id, source_ip, "expired")
                .await?;
            return Ok(SessionValidation {
                is_valid: false,
                user_id: None,
                security_context: SecurityContext::default(),
            });
        }

        let device_match = session.device_fingerprint == device_fingerprint;
        let ip_match = session.ip_address == source_ip;
        let concurrent = self
            .timed("session-store", self.sessions.count_for_user(session.user_id))
            .await?;
        let is_valid = device_match && ip_match;

        if is_valid {
            self.timed("session-store", self.sessions.touch(session_id, now))
                .await?;
        } else {
            warn!(
                user_id = %session.user_id,
                device_match,
                ip_match,
                "Session fingerprint mismatch"
            );
            self.audit
                .append(CreateAuditLogEntry {
                    event_type: AuditEventType::SessionValidationFailed,
                    severity: AuditSeverity::Warning,
                    actor_id: session.user_id,
                    resource_id: Some(session_id.to_string()),
                    resource_type: Some("session".into()),
                    ip_address: Some(source_ip.to_string()),
                    user_agent: None,
                    details: json!({
                        "reason": "fingerprint_mismatch",
                        "device_match": device_match,
                        "ip_match": ip_match,
                    }),
                })
                .await?;
        }

        Ok(SessionValidation {
            is_valid,
            user_id: is_valid.then_some(session.user_id),
            security_context: SecurityContext {
                device_match,
                ip_match,
                concurrent,
            },
        })
    }

    /// Remove a session. Revoking an unknown session succeeds silently.
    ///
    /// There is no soft-revocation grace period; `force` is recorded in
    /// the audit trail only.
    pub async fn revoke_session(&self, session_id: &str, force: bool) -> EstateKitResult<()> {
        let session = match self.timed("session-store", self.sessions.get(session_id)).await {
            Ok(session) => session,
            Err(EstateKitError::NotFound { .. }) => return Ok(()),
            Err(e) => return Err(e),
        };

        self.timed("session-store", self.sessions.delete(session_id))
            .await?;
        self.audit
            .append(CreateAuditLogEntry {
                event_type: AuditEventType::SessionRevoked,
                severity: AuditSeverity::Info,
                actor_id: session.user_id,
                resource_id: Some(session_id.to_string()),
                resource_type: Some("session".into()),
                ip_address: Some(session.ip_address),
                user_agent: None,
                details: json!({ "forced": force }),
            })
            .await?;

        Ok(())
    }

    /// Periodic maintenance: remove sessions idle past the TTL
    /// (`last_accessed_at + TTL` elapsed). Returns the number removed.
    ///
    /// Safe to run concurrently with `authenticate`/`validate_session`:
    /// the store removes individual records, never replacing a user's
    /// whole session set.
    pub async fn cleanup_expired_sessions(&self) -> EstateKitResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::seconds(self.config.session_ttl_secs as i64);
        let removed = self
            .timed("session-store", self.sessions.delete_inactive(cutoff))
            .await?;
        if removed > 0 {
            info!(removed, "Expired session sweep complete");
        }
        Ok(removed)
    }

    async fn audit_validation_failure(
        &self,
        actor_id: Uuid,
        session_id: &str,
        source_ip: &str,
        reason: &str,
    ) -> EstateKitResult<()> {
        self.audit
            .append(CreateAuditLogEntry {
                event_type: AuditEventType::SessionValidationFailed,
                severity: AuditSeverity::Warning,
                actor_id,
                resource_id: Some(session_id.to_string()),
                resource_type: Some("session".into()),
                ip_address: Some(source_ip.to_string()),
                user_agent: None,
                details: json!({ "reason": reason }),
            })
            .await?;
        Ok(())
    }

    fn user_lock(&self, user_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Remove a user's lock entry once no login holds it, keeping the
    /// map bounded by in-flight logins rather than users ever seen.
    fn prune_user_lock(&self, user_id: Uuid) {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&user_id);
        }
    }

    /// Bound an external call; elapse surfaces as a dependency timeout.
    async fn timed<T>(
        &self,
        dependency: &str,
        fut: impl Future<Output = EstateKitResult<T>>,
    ) -> EstateKitResult<T> {
        match tokio::time::timeout(
            Duration::from_secs(self.config.dependency_timeout_secs),
            fut,
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SessionError::Timeout {
                dependency: dependency.into(),
            }
            .into()),
        }
    }
}
