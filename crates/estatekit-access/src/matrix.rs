//! Static role → permission matrix.
//!
//! Each delegate role has a fixed maximum set of
//! (resource type, access level) pairs. A delegate's effective
//! permission set is the intersection of its explicit grants and this
//! matrix; a grant outside the matrix is rejected at creation time.

use estatekit_core::models::delegate::{AccessLevel, DelegateRole, PermissionGrant, ResourceType};

use crate::error::AccessError;

const EXECUTOR: &[PermissionGrant] = &[
    PermissionGrant::new(ResourceType::PersonalInfo, AccessLevel::Read),
    PermissionGrant::new(ResourceType::FinancialData, AccessLevel::Read),
    PermissionGrant::new(ResourceType::LegalDocs, AccessLevel::Read),
];

const HEALTHCARE_PROXY: &[PermissionGrant] = &[
    PermissionGrant::new(ResourceType::PersonalInfo, AccessLevel::Read),
    PermissionGrant::new(ResourceType::MedicalData, AccessLevel::Read),
    PermissionGrant::new(ResourceType::LegalDocs, AccessLevel::Read),
];

const FINANCIAL_ADVISOR: &[PermissionGrant] =
    &[PermissionGrant::new(ResourceType::FinancialData, AccessLevel::Read)];

const LEGAL_ADVISOR: &[PermissionGrant] = &[
    PermissionGrant::new(ResourceType::PersonalInfo, AccessLevel::Read),
    PermissionGrant::new(ResourceType::LegalDocs, AccessLevel::Read),
    PermissionGrant::new(ResourceType::FinancialData, AccessLevel::Read),
];

/// Maximum allowed grants for a role.
pub fn allowed_grants(role: DelegateRole) -> &'static [PermissionGrant] {
    match role {
        DelegateRole::Executor => EXECUTOR,
        DelegateRole::HealthcareProxy => HEALTHCARE_PROXY,
        DelegateRole::FinancialAdvisor => FINANCIAL_ADVISOR,
        DelegateRole::LegalAdvisor => LEGAL_ADVISOR,
    }
}

/// Whether a single grant lies within the role's matrix.
pub fn is_grant_allowed(role: DelegateRole, grant: &PermissionGrant) -> bool {
    allowed_grants(role).contains(grant)
}

/// Reject any grant not present in the role's allowed set.
///
/// Pure and synchronous; used by delegate create and update flows.
pub fn validate_permission_matrix(
    role: DelegateRole,
    grants: &[PermissionGrant],
) -> Result<(), AccessError> {
    if grants.iter().all(|g| is_grant_allowed(role, g)) {
        Ok(())
    } else {
        Err(AccessError::InvalidPermissions)
    }
}
