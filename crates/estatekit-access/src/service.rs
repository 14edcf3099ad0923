//! Delegate lifecycle and access evaluation.
//!
//! Every access decision (grant or deny) writes exactly one audit
//! entry before the decision is returned to the caller.

use chrono::{DateTime, Utc};
use estatekit_core::error::{EstateKitError, EstateKitResult};
use estatekit_core::crypto::CipherService;
use estatekit_core::metrics::MetricsSink;
use estatekit_core::models::audit::{AuditEventType, AuditSeverity, CreateAuditLogEntry};
use estatekit_core::models::delegate::{
    AccessLevel, CreateDelegate, Delegate, DelegateRole, DelegateStatus, PermissionGrant,
    ResourceType, UpdateDelegate,
};
use estatekit_core::repository::{AuditLogRepository, DelegateRepository};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::AccessError;
use crate::matrix;
use crate::validate;

/// Owner's invitation to a delegate.
#[derive(Debug, Clone)]
pub struct DelegateInvite {
    pub email: String,
    pub role: DelegateRole,
    pub permissions: Vec<PermissionGrant>,
    pub expires_at: DateTime<Utc>,
}

/// Owner-initiated changes to a delegate.
#[derive(Debug, Clone, Default)]
pub struct UpdateDelegateInput {
    pub permissions: Option<Vec<PermissionGrant>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Delegate access evaluator.
///
/// The cipher is an explicitly injected dependency; there is no
/// ambient encryption singleton.
pub struct DelegateService<D, A, C, M>
where
    D: DelegateRepository,
    A: AuditLogRepository,
    C: CipherService,
    M: MetricsSink,
{
    delegates: D,
    audit: A,
    cipher: C,
    metrics: M,
}

impl<D, A, C, M> DelegateService<D, A, C, M>
where
    D: DelegateRepository,
    A: AuditLogRepository,
    C: CipherService,
    M: MetricsSink,
{
    pub fn new(delegates: D, audit: A, cipher: C, metrics: M) -> Self {
        Self {
            delegates,
            audit,
            cipher,
            metrics,
        }
    }

    /// Invite a delegate: validate, encrypt contact info, persist in
    /// `Pending` status.
    ///
    /// Validation failures perform no persistence, audit, or metric
    /// write. An encryption failure aborts creation with no partial
    /// record.
    pub async fn create_delegate(
        &self,
        owner_id: Uuid,
        invite: DelegateInvite,
    ) -> EstateKitResult<Delegate> {
        if !validate::is_valid_email(&invite.email) {
            return Err(AccessError::InvalidEmail.into());
        }
        matrix::validate_permission_matrix(invite.role, &invite.permissions)?;

        let email = self.cipher.encrypt(invite.email.as_bytes())?;

        let delegate = self
            .delegates
            .create(CreateDelegate {
                owner_id,
                email,
                role: invite.role,
                expires_at: invite.expires_at,
                permissions: invite.permissions,
            })
            .await?;

        self.audit
            .append(CreateAuditLogEntry {
                event_type: AuditEventType::DelegateInvite,
                severity: AuditSeverity::Info,
                actor_id: owner_id,
                resource_id: Some(delegate.id.to_string()),
                resource_type: Some("delegate".into()),
                ip_address: None,
                user_agent: None,
                details: json!({ "role": delegate.role }),
            })
            .await?;
        self.metrics.incr("delegate_invite");
        info!(delegate_id = %delegate.id, owner_id = %owner_id, "Delegate invited");

        Ok(delegate)
    }

    /// Delegate accepts the invitation: `Pending -> Active`.
    pub async fn accept_delegate(&self, delegate_id: Uuid) -> EstateKitResult<Delegate> {
        let delegate = self.delegates.get_by_id(delegate_id).await?;
        let updated = self
            .transition(delegate, DelegateStatus::Active, AuditEventType::DelegateAccepted)
            .await?;
        Ok(updated)
    }

    /// Owner revokes a delegate: `Pending | Active -> Revoked`.
    /// Terminal — a revoked delegate can never be reactivated.
    pub async fn revoke_delegate(
        &self,
        owner_id: Uuid,
        delegate_id: Uuid,
    ) -> EstateKitResult<Delegate> {
        let delegate = self.owned_delegate(owner_id, delegate_id).await?;
        let updated = self
            .transition(delegate, DelegateStatus::Revoked, AuditEventType::DelegateRevoked)
            .await?;
        Ok(updated)
    }

    /// Owner-initiated grant/expiry changes. Replacement grants are
    /// re-validated against the role matrix.
    ///
    /// A delegate in a terminal status, or one already past its
    /// `expires_at`, is closed: expiry and revocation are permanent and
    /// a new delegate record must be created instead. Without this
    /// check an owner could push a lapsed `expires_at` into the future
    /// and resurrect the delegate's access.
    pub async fn update_delegate(
        &self,
        owner_id: Uuid,
        delegate_id: Uuid,
        input: UpdateDelegateInput,
    ) -> EstateKitResult<Delegate> {
        let delegate = self.owned_delegate(owner_id, delegate_id).await?;
        if matches!(
            delegate.status,
            DelegateStatus::Expired | DelegateStatus::Revoked
        ) || Utc::now() >= delegate.expires_at
        {
            return Err(AccessError::DelegateClosed.into());
        }
        if let Some(ref permissions) = input.permissions {
            matrix::validate_permission_matrix(delegate.role, permissions)?;
        }

        let updated = self
            .delegates
            .update(
                delegate.id,
                UpdateDelegate {
                    status: None,
                    expires_at: input.expires_at,
                    permissions: input.permissions,
                },
            )
            .await?;

        self.audit
            .append(CreateAuditLogEntry {
                event_type: AuditEventType::DelegateUpdated,
                severity: AuditSeverity::Info,
                actor_id: owner_id,
                resource_id: Some(delegate.id.to_string()),
                resource_type: Some("delegate".into()),
                ip_address: None,
                user_agent: None,
                details: json!({ "permissions": updated.permissions }),
            })
            .await?;

        Ok(updated)
    }

    /// Fetch a delegate, scoped to its owner.
    pub async fn get_delegate(&self, owner_id: Uuid, delegate_id: Uuid) -> EstateKitResult<Delegate> {
        self.owned_delegate(owner_id, delegate_id).await
    }

    /// Decrypt a delegate's stored contact address.
    pub fn contact_email(&self, delegate: &Delegate) -> EstateKitResult<String> {
        let plaintext = self.cipher.decrypt(&delegate.email)?;
        String::from_utf8(plaintext)
            .map_err(|e| EstateKitError::Encryption(format!("contact not utf-8: {e}")))
    }

    /// Decide whether a delegate may perform `required_access` on
    /// `resource_type`.
    ///
    /// Returns `false` — never an error — for every domain denial:
    /// delegate absent, not active, expired, or lacking an exact
    /// matching grant. Grants only when the delegate is active, not
    /// expired, and the grant lies within the role matrix. Expiry-caused
    /// denials are audited at WARNING severity; all other outcomes at
    /// INFO.
    pub async fn verify_delegate_access(
        &self,
        delegate_id: Uuid,
        resource_type: ResourceType,
        required_access: AccessLevel,
    ) -> EstateKitResult<bool> {
        let delegate = match self.delegates.get_by_id(delegate_id).await {
            Ok(delegate) => delegate,
            Err(EstateKitError::NotFound { .. }) => {
                self.audit_access(
                    Uuid::nil(),
                    delegate_id,
                    resource_type,
                    required_access,
                    false,
                    AuditSeverity::Info,
                    "not_found",
                )
                .await?;
                self.metrics.incr("delegate_access_denied");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let requested = PermissionGrant::new(resource_type, required_access);
        let (granted, severity, reason) = if Utc::now() >= delegate.expires_at {
            (false, AuditSeverity::Warning, "expired")
        } else if delegate.status != DelegateStatus::Active {
            (false, AuditSeverity::Info, "not_active")
        } else if delegate.permissions.contains(&requested)
            && matrix::is_grant_allowed(delegate.role, &requested)
        {
            (true, AuditSeverity::Info, "granted")
        } else {
            (false, AuditSeverity::Info, "no_matching_grant")
        };

        self.audit_access(
            delegate.owner_id,
            delegate_id,
            resource_type,
            required_access,
            granted,
            severity,
            reason,
        )
        .await?;
        if !granted {
            self.metrics.incr("delegate_access_denied");
        }

        Ok(granted)
    }

    async fn owned_delegate(&self, owner_id: Uuid, delegate_id: Uuid) -> EstateKitResult<Delegate> {
        let delegate = self.delegates.get_by_id(delegate_id).await?;
        if delegate.owner_id != owner_id {
            // Do not reveal other owners' delegates.
            return Err(EstateKitError::NotFound {
                entity: "delegate".into(),
                id: delegate_id.to_string(),
            });
        }
        Ok(delegate)
    }

    async fn transition(
        &self,
        delegate: Delegate,
        next: DelegateStatus,
        event_type: AuditEventType,
    ) -> EstateKitResult<Delegate> {
        if !delegate.status.can_transition_to(next) {
            return Err(AccessError::InvalidTransition {
                from: delegate.status,
                to: next,
            }
            .into());
        }

        let updated = self
            .delegates
            .update(
                delegate.id,
                UpdateDelegate {
                    status: Some(next),
                    ..Default::default()
                },
            )
            .await?;

        self.audit
            .append(CreateAuditLogEntry {
                event_type,
                severity: AuditSeverity::Info,
                actor_id: delegate.owner_id,
                resource_id: Some(delegate.id.to_string()),
                resource_type: Some("delegate".into()),
                ip_address: None,
                user_agent: None,
                details: json!({ "from": delegate.status, "to": next }),
            })
            .await?;

        Ok(updated)
    }

    #[allow(clippy::too_many_arguments)]
    async fn audit_access(
        &self,
        actor_id: Uuid,
        delegate_id: Uuid,
        resource_type: ResourceType,
        required_access: AccessLevel,
        access_granted: bool,
        severity: AuditSeverity,
        reason: &str,
    ) -> EstateKitResult<()> {
        self.audit
            .append(CreateAuditLogEntry {
                event_type: AuditEventType::DelegateAccess,
                severity,
                actor_id,
                resource_id: Some(delegate_id.to_string()),
                resource_type: Some("delegate".into()),
                ip_address: None,
                user_agent: None,
                details: json!({
                    "resource_type": resource_type,
                    "required_access": required_access,
                    "access_granted": access_granted,
                    "reason": reason,
                }),
            })
            .await?;
        Ok(())
    }
}
