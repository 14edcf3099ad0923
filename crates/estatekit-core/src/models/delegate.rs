//! Delegate domain model.
//!
//! A delegate is a third party granted time-bound, role-scoped access
//! to portions of an owner's data. Grants are coarse-grained at the
//! resource-type level, not per-record ACLs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::EncryptedValue;

/// Fixed set of delegate roles. Each role has a static maximum
/// permission matrix (see `estatekit-access`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DelegateRole {
    Executor,
    HealthcareProxy,
    FinancialAdvisor,
    LegalAdvisor,
}

/// Delegate lifecycle status. `Expired` and `Revoked` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DelegateStatus {
    Pending,
    Active,
    Expired,
    Revoked,
}

impl DelegateStatus {
    /// Whether the lifecycle state machine permits moving to `next`.
    ///
    /// `pending -> active | revoked`, `active -> expired | revoked`.
    /// No transition leaves a terminal state; a new delegate record
    /// must be created instead.
    pub fn can_transition_to(self, next: DelegateStatus) -> bool {
        matches!(
            (self, next),
            (DelegateStatus::Pending, DelegateStatus::Active)
                | (DelegateStatus::Pending, DelegateStatus::Revoked)
                | (DelegateStatus::Active, DelegateStatus::Expired)
                | (DelegateStatus::Active, DelegateStatus::Revoked)
        )
    }
}

/// Resource types a delegate grant can cover.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    PersonalInfo,
    FinancialData,
    MedicalData,
    LegalDocs,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    Read,
    Write,
}

/// A single explicit permission grant: resource type × access level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PermissionGrant {
    pub resource_type: ResourceType,
    pub access_level: AccessLevel,
}

impl PermissionGrant {
    pub const fn new(resource_type: ResourceType, access_level: AccessLevel) -> Self {
        Self {
            resource_type,
            access_level,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delegate {
    pub id: Uuid,
    /// The account granting access.
    pub owner_id: Uuid,
    /// Contact email, AES-256-GCM encrypted at rest.
    pub email: EncryptedValue,
    pub role: DelegateRole,
    pub status: DelegateStatus,
    pub expires_at: DateTime<Utc>,
    /// Explicit grants; validated against the role matrix at creation.
    pub permissions: Vec<PermissionGrant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDelegate {
    pub owner_id: Uuid,
    pub email: EncryptedValue,
    pub role: DelegateRole,
    pub expires_at: DateTime<Utc>,
    pub permissions: Vec<PermissionGrant>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateDelegate {
    pub status: Option<DelegateStatus>,
    pub expires_at: Option<DateTime<Utc>>,
    pub permissions: Option<Vec<PermissionGrant>>,
}
