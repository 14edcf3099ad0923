//! Integration tests for the delegate access evaluator using
//! in-memory SurrealDB and a real AES-256-GCM cipher.

use chrono::{Duration, Utc};
use estatekit_access::{DelegateInvite, DelegateService, UpdateDelegateInput};
use estatekit_core::crypto::Aes256GcmCipher;
use estatekit_core::error::EstateKitError;
use estatekit_core::metrics::NoopMetrics;
use estatekit_core::models::audit::{AuditEventType, AuditSeverity};
use estatekit_core::models::delegate::{
    AccessLevel, DelegateRole, DelegateStatus, PermissionGrant, ResourceType,
};
use estatekit_core::repository::{AuditLogFilter, AuditLogRepository, Pagination};
use estatekit_db::repository::{SurrealAuditLogRepository, SurrealDelegateRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type TestService = DelegateService<
    SurrealDelegateRepository<Db>,
    SurrealAuditLogRepository<Db>,
    Aes256GcmCipher,
    NoopMetrics,
>;

struct Harness {
    service: TestService,
    audit: SurrealAuditLogRepository<Db>,
    owner_id: Uuid,
}

async fn setup() -> Harness {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    estatekit_db::run_migrations(&db).await.unwrap();

    let delegates = SurrealDelegateRepository::new(db.clone());
    let audit = SurrealAuditLogRepository::new(db);
    let service = DelegateService::new(
        delegates,
        audit.clone(),
        Aes256GcmCipher::new([7u8; 32]),
        NoopMetrics,
    );

    Harness {
        service,
        audit,
        owner_id: Uuid::new_v4(),
    }
}

fn financial_invite() -> DelegateInvite {
    DelegateInvite {
        email: "advisor@example.com".into(),
        role: DelegateRole::FinancialAdvisor,
        permissions: vec![PermissionGrant::new(
            ResourceType::FinancialData,
            AccessLevel::Read,
        )],
        expires_at: Utc::now() + Duration::days(90),
    }
}

async fn count_events(audit: &SurrealAuditLogRepository<Db>, event_type: AuditEventType) -> u64 {
    audit
        .list(
            AuditLogFilter {
                event_type: Some(event_type),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap()
        .total
}

// -----------------------------------------------------------------------
// Creation
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_delegate_encrypts_contact_and_starts_pending() {
    let h = setup().await;

    let delegate = h
        .service
        .create_delegate(h.owner_id, financial_invite())
        .await
        .unwrap();

    assert_eq!(delegate.status, DelegateStatus::Pending);
    assert_eq!(delegate.owner_id, h.owner_id);
    // Stored ciphertext, not the address itself.
    assert_ne!(delegate.email.content, "advisor@example.com");
    assert_eq!(
        h.service.contact_email(&delegate).unwrap(),
        "advisor@example.com"
    );

    assert_eq!(count_events(&h.audit, AuditEventType::DelegateInvite).await, 1);
}

#[tokio::test]
async fn invalid_email_is_rejected_before_any_write() {
    let h = setup().await;

    let err = h
        .service
        .create_delegate(
            h.owner_id,
            DelegateInvite {
                email: "not-an-address".into(),
                ..financial_invite()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EstateKitError::Validation { .. }));

    let page = h
        .audit
        .list(AuditLogFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0, "rejected invite must leave no trace");
}

#[tokio::test]
async fn grant_outside_role_matrix_is_rejected() {
    let h = setup().await;

    let err = h
        .service
        .create_delegate(
            h.owner_id,
            DelegateInvite {
                permissions: vec![PermissionGrant::new(
                    ResourceType::MedicalData,
                    AccessLevel::Write,
                )],
                ..financial_invite()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EstateKitError::Validation { .. }));
    assert_eq!(count_events(&h.audit, AuditEventType::DelegateInvite).await, 0);
}

// -----------------------------------------------------------------------
// Lifecycle
// -----------------------------------------------------------------------

#[tokio::test]
async fn accept_moves_pending_to_active() {
    let h = setup().await;
    let delegate = h
        .service
        .create_delegate(h.owner_id, financial_invite())
        .await
        .unwrap();

    let accepted = h.service.accept_delegate(delegate.id).await.unwrap();
    assert_eq!(accepted.status, DelegateStatus::Active);
    assert_eq!(count_events(&h.audit, AuditEventType::DelegateAccepted).await, 1);
}

#[tokio::test]
async fn revoked_delegate_cannot_be_accepted() {
    let h = setup().await;
    let delegate = h
        .service
        .create_delegate(h.owner_id, financial_invite())
        .await
        .unwrap();

    let revoked = h
        .service
        .revoke_delegate(h.owner_id, delegate.id)
        .await
        .unwrap();
    assert_eq!(revoked.status, DelegateStatus::Revoked);

    // Revocation is terminal.
    let err = h.service.accept_delegate(delegate.id).await.unwrap_err();
    assert!(matches!(err, EstateKitError::Validation { .. }));
}

#[tokio::test]
async fn other_owner_cannot_see_or_revoke_delegate() {
    let h = setup().await;
    let delegate = h
        .service
        .create_delegate(h.owner_id, financial_invite())
        .await
        .unwrap();

    let stranger = Uuid::new_v4();
    assert!(matches!(
        h.service.get_delegate(stranger, delegate.id).await,
        Err(EstateKitError::NotFound { .. })
    ));
    assert!(matches!(
        h.service.revoke_delegate(stranger, delegate.id).await,
        Err(EstateKitError::NotFound { .. })
    ));
}

#[tokio::test]
async fn update_revalidates_replacement_grants() {
    let h = setup().await;
    let delegate = h
        .service
        .create_delegate(h.owner_id, financial_invite())
        .await
        .unwrap();

    let err = h
        .service
        .update_delegate(
            h.owner_id,
            delegate.id,
            UpdateDelegateInput {
                permissions: Some(vec![PermissionGrant::new(
                    ResourceType::MedicalData,
                    AccessLevel::Read,
                )]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EstateKitError::Validation { .. }));

    // A valid replacement goes through.
    let updated = h
        .service
        .update_delegate(
            h.owner_id,
            delegate.id,
            UpdateDelegateInput {
                expires_at: Some(Utc::now() + Duration::days(180)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.expires_at > delegate.expires_at);
}

#[tokio::test]
async fn lapsed_delegate_cannot_be_resurrected_by_extending_expiry() {
    let h = setup().await;
    let delegate = h
        .service
        .create_delegate(
            h.owner_id,
            DelegateInvite {
                expires_at: Utc::now() + Duration::milliseconds(1),
                ..financial_invite()
            },
        )
        .await
        .unwrap();
    h.service.accept_delegate(delegate.id).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    // Expiry is permanent: pushing expires_at back out must be refused.
    let err = h
        .service
        .update_delegate(
            h.owner_id,
            delegate.id,
            UpdateDelegateInput {
                expires_at: Some(Utc::now() + Duration::days(30)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EstateKitError::Validation { .. }));

    let granted = h
        .service
        .verify_delegate_access(delegate.id, ResourceType::FinancialData, AccessLevel::Read)
        .await
        .unwrap();
    assert!(!granted, "lapsed delegate must stay denied");
}

#[tokio::test]
async fn revoked_delegate_rejects_updates() {
    let h = setup().await;
    let delegate = h
        .service
        .create_delegate(h.owner_id, financial_invite())
        .await
        .unwrap();
    h.service
        .revoke_delegate(h.owner_id, delegate.id)
        .await
        .unwrap();

    let err = h
        .service
        .update_delegate(
            h.owner_id,
            delegate.id,
            UpdateDelegateInput {
                expires_at: Some(Utc::now() + Duration::days(30)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EstateKitError::Validation { .. }));
}

// -----------------------------------------------------------------------
// Access evaluation
// -----------------------------------------------------------------------

#[tokio::test]
async fn active_delegate_with_matching_grant_is_granted() {
    let h = setup().await;
    let delegate = h
        .service
        .create_delegate(h.owner_id, financial_invite())
        .await
        .unwrap();
    h.service.accept_delegate(delegate.id).await.unwrap();

    let granted = h
        .service
        .verify_delegate_access(delegate.id, ResourceType::FinancialData, AccessLevel::Read)
        .await
        .unwrap();
    assert!(granted);

    // No grant for other resource types, even at the same level.
    let denied = h
        .service
        .verify_delegate_access(delegate.id, ResourceType::MedicalData, AccessLevel::Read)
        .await
        .unwrap();
    assert!(!denied);

    // Both decisions audited.
    assert_eq!(count_events(&h.audit, AuditEventType::DelegateAccess).await, 2);
}

#[tokio::test]
async fn pending_delegate_is_denied() {
    let h = setup().await;
    let delegate = h
        .service
        .create_delegate(h.owner_id, financial_invite())
        .await
        .unwrap();

    let granted = h
        .service
        .verify_delegate_access(delegate.id, ResourceType::FinancialData, AccessLevel::Read)
        .await
        .unwrap();
    assert!(!granted);
}

#[tokio::test]
async fn expired_delegate_is_denied_at_warning_severity() {
    let h = setup().await;
    let delegate = h
        .service
        .create_delegate(
            h.owner_id,
            DelegateInvite {
                expires_at: Utc::now() + Duration::milliseconds(1),
                ..financial_invite()
            },
        )
        .await
        .unwrap();
    h.service.accept_delegate(delegate.id).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let granted = h
        .service
        .verify_delegate_access(delegate.id, ResourceType::FinancialData, AccessLevel::Read)
        .await
        .unwrap();
    assert!(!granted);

    let decisions = h
        .audit
        .list(
            AuditLogFilter {
                event_type: Some(AuditEventType::DelegateAccess),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(decisions.total, 1);
    assert_eq!(decisions.items[0].severity, AuditSeverity::Warning);
    assert_eq!(decisions.items[0].details["reason"], "expired");
}

#[tokio::test]
async fn unknown_delegate_is_denied_not_errored() {
    let h = setup().await;

    let granted = h
        .service
        .verify_delegate_access(Uuid::new_v4(), ResourceType::LegalDocs, AccessLevel::Read)
        .await
        .unwrap();
    assert!(!granted);

    let decisions = h
        .audit
        .list(
            AuditLogFilter {
                event_type: Some(AuditEventType::DelegateAccess),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(decisions.total, 1);
    assert_eq!(decisions.items[0].actor_id, Uuid::nil());
    assert_eq!(decisions.items[0].details["access_granted"], false);
}
