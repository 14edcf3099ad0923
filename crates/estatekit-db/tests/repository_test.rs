//! Integration tests for the repository implementations using
//! in-memory SurrealDB.

use chrono::{Duration, Utc};
use estatekit_core::crypto::EncryptedValue;
use estatekit_core::error::EstateKitError;
use estatekit_core::models::audit::{AuditEventType, AuditSeverity, CreateAuditLogEntry};
use estatekit_core::models::delegate::{
    AccessLevel, CreateDelegate, DelegateRole, DelegateStatus, PermissionGrant, ResourceType,
    UpdateDelegate,
};
use estatekit_core::models::session::CreateSession;
use estatekit_core::models::user::CreateUser;
use estatekit_core::repository::{
    AuditLogFilter, AuditLogRepository, DelegateRepository, Pagination, SessionRepository,
    UserRepository,
};
use estatekit_db::repository::{
    SurrealAuditLogRepository, SurrealDelegateRepository, SurrealSessionRepository,
    SurrealUserRepository,
};
use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    estatekit_db::run_migrations(&db).await.unwrap();
    db
}

fn dummy_email() -> EncryptedValue {
    EncryptedValue {
        content: "Y2lwaGVydGV4dA".into(),
        iv: "bm9uY2Vub25jZQ".into(),
        auth_tag: "dGFnZ2VkdGFnZ2VkdGFnZ2Vk".into(),
    }
}

// -----------------------------------------------------------------------
// User tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_user() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo
        .create(CreateUser {
            subject: "auth0|abc123".into(),
            email: "owner@example.com".into(),
            name: "Pat Owner".into(),
        })
        .await
        .unwrap();

    let fetched = repo.get_by_id(user.id).await.unwrap();
    assert_eq!(fetched.id, user.id);
    assert_eq!(fetched.subject, "auth0|abc123");
    assert_eq!(fetched.email, "owner@example.com");
}

#[tokio::test]
async fn get_user_by_subject() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo
        .create(CreateUser {
            subject: "auth0|subject-lookup".into(),
            email: "lookup@example.com".into(),
            name: "Lookup".into(),
        })
        .await
        .unwrap();

    let fetched = repo.get_by_subject("auth0|subject-lookup").await.unwrap();
    assert_eq!(fetched.id, user.id);

    let missing = repo.get_by_subject("auth0|nobody").await;
    assert!(matches!(missing, Err(EstateKitError::NotFound { .. })));
}

// -----------------------------------------------------------------------
// Session tests
// -----------------------------------------------------------------------

fn session_input(id: &str, user_id: Uuid) -> CreateSession {
    CreateSession {
        id: id.into(),
        user_id,
        device_fingerprint: "fp-abc".into(),
        ip_address: "203.0.113.7".into(),
        expires_at: Utc::now() + Duration::hours(24),
    }
}

#[tokio::test]
async fn create_get_and_delete_session() {
    let db = setup().await;
    let repo = SurrealSessionRepository::new(db);
    let user_id = Uuid::new_v4();

    let session = repo.create(session_input("tok-1", user_id)).await.unwrap();
    assert_eq!(session.id, "tok-1");
    assert_eq!(session.user_id, user_id);

    let fetched = repo.get("tok-1").await.unwrap();
    assert_eq!(fetched.device_fingerprint, "fp-abc");

    repo.delete("tok-1").await.unwrap();
    assert!(matches!(
        repo.get("tok-1").await,
        Err(EstateKitError::NotFound { .. })
    ));

    // Deleting an absent session is a silent success.
    repo.delete("tok-1").await.unwrap();
}

#[tokio::test]
async fn list_sessions_oldest_first() {
    let db = setup().await;
    let repo = SurrealSessionRepository::new(db);
    let user_id = Uuid::new_v4();

    repo.create(session_input("tok-a", user_id)).await.unwrap();
    repo.create(session_input("tok-b", user_id)).await.unwrap();
    repo.create(session_input("tok-c", user_id)).await.unwrap();
    // Another user's session must not appear.
    repo.create(session_input("tok-other", Uuid::new_v4()))
        .await
        .unwrap();

    let sessions = repo.list_for_user(user_id).await.unwrap();
    let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["tok-a", "tok-b", "tok-c"]);

    assert_eq!(repo.count_for_user(user_id).await.unwrap(), 3);
}

#[tokio::test]
async fn touch_refreshes_last_accessed() {
    let db = setup().await;
    let repo = SurrealSessionRepository::new(db);
    let user_id = Uuid::new_v4();

    let session = repo.create(session_input("tok-touch", user_id)).await.unwrap();
    let later = session.last_accessed_at + Duration::minutes(10);

    repo.touch("tok-touch", later).await.unwrap();

    let fetched = repo.get("tok-touch").await.unwrap();
    assert_eq!(fetched.last_accessed_at, later);
    assert_eq!(fetched.created_at, session.created_at);
}

#[tokio::test]
async fn delete_inactive_removes_only_stale_sessions() {
    let db = setup().await;
    let repo = SurrealSessionRepository::new(db);
    let user_id = Uuid::new_v4();

    repo.create(session_input("tok-stale", user_id)).await.unwrap();
    repo.create(session_input("tok-fresh", user_id)).await.unwrap();

    // Age one session far past any cutoff.
    repo.touch("tok-stale", Utc::now() - Duration::days(30))
        .await
        .unwrap();

    let removed = repo
        .delete_inactive(Utc::now() - Duration::days(1))
        .await
        .unwrap();
    assert_eq!(removed, 1);

    assert!(repo.get("tok-stale").await.is_err());
    assert!(repo.get("tok-fresh").await.is_ok());
}

// -----------------------------------------------------------------------
// Delegate tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_delegate() {
    let db = setup().await;
    let repo = SurrealDelegateRepository::new(db);
    let owner_id = Uuid::new_v4();

    let delegate = repo
        .create(CreateDelegate {
            owner_id,
            email: dummy_email(),
            role: DelegateRole::FinancialAdvisor,
            expires_at: Utc::now() + Duration::days(90),
            permissions: vec![PermissionGrant::new(
                ResourceType::FinancialData,
                AccessLevel::Read,
            )],
        })
        .await
        .unwrap();

    assert_eq!(delegate.owner_id, owner_id);
    assert_eq!(delegate.status, DelegateStatus::Pending);
    assert_eq!(delegate.role, DelegateRole::FinancialAdvisor);

    let fetched = repo.get_by_id(delegate.id).await.unwrap();
    assert_eq!(fetched.id, delegate.id);
    assert_eq!(fetched.email.content, "Y2lwaGVydGV4dA");
    assert_eq!(
        fetched.permissions,
        vec![PermissionGrant::new(
            ResourceType::FinancialData,
            AccessLevel::Read
        )]
    );
}

#[tokio::test]
async fn update_delegate_status_and_permissions() {
    let db = setup().await;
    let repo = SurrealDelegateRepository::new(db);

    let delegate = repo
        .create(CreateDelegate {
            owner_id: Uuid::new_v4(),
            email: dummy_email(),
            role: DelegateRole::Executor,
            expires_at: Utc::now() + Duration::days(30),
            permissions: vec![PermissionGrant::new(
                ResourceType::PersonalInfo,
                AccessLevel::Read,
            )],
        })
        .await
        .unwrap();

    let updated = repo
        .update(
            delegate.id,
            UpdateDelegate {
                status: Some(DelegateStatus::Active),
                permissions: Some(vec![
                    PermissionGrant::new(ResourceType::PersonalInfo, AccessLevel::Read),
                    PermissionGrant::new(ResourceType::LegalDocs, AccessLevel::Read),
                ]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.status, DelegateStatus::Active);
    assert_eq!(updated.permissions.len(), 2);
    assert_eq!(updated.expires_at, delegate.expires_at); // unchanged
    assert!(updated.updated_at >= delegate.updated_at);
}

#[tokio::test]
async fn list_delegates_for_owner() {
    let db = setup().await;
    let repo = SurrealDelegateRepository::new(db);
    let owner_id = Uuid::new_v4();

    for _ in 0..3 {
        repo.create(CreateDelegate {
            owner_id,
            email: dummy_email(),
            role: DelegateRole::LegalAdvisor,
            expires_at: Utc::now() + Duration::days(30),
            permissions: vec![PermissionGrant::new(
                ResourceType::LegalDocs,
                AccessLevel::Read,
            )],
        })
        .await
        .unwrap();
    }
    repo.create(CreateDelegate {
        owner_id: Uuid::new_v4(),
        email: dummy_email(),
        role: DelegateRole::Executor,
        expires_at: Utc::now() + Duration::days(30),
        permissions: vec![],
    })
    .await
    .unwrap();

    let page = repo
        .list_for_owner(
            owner_id,
            Pagination {
                offset: 0,
                limit: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);

    let rest = repo
        .list_for_owner(
            owner_id,
            Pagination {
                offset: 2,
                limit: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(rest.items.len(), 1);
}

// -----------------------------------------------------------------------
// Audit log tests
// -----------------------------------------------------------------------

fn audit_input(actor_id: Uuid, event_type: AuditEventType) -> CreateAuditLogEntry {
    CreateAuditLogEntry {
        event_type,
        severity: AuditSeverity::Info,
        actor_id,
        resource_id: Some("res-1".into()),
        resource_type: Some("session".into()),
        ip_address: Some("203.0.113.7".into()),
        user_agent: None,
        details: json!({ "reason": "test" }),
    }
}

#[tokio::test]
async fn append_and_list_audit_entries() {
    let db = setup().await;
    let repo = SurrealAuditLogRepository::new(db);
    let actor = Uuid::new_v4();

    let entry = repo
        .append(audit_input(actor, AuditEventType::UserLogin))
        .await
        .unwrap();
    assert_eq!(entry.actor_id, actor);
    assert_eq!(entry.event_type, AuditEventType::UserLogin);
    assert_eq!(entry.details["reason"], "test");

    repo.append(audit_input(actor, AuditEventType::SessionRevoked))
        .await
        .unwrap();

    let page = repo
        .list(AuditLogFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    // Oldest first.
    assert_eq!(page.items[0].event_type, AuditEventType::UserLogin);
}

#[tokio::test]
async fn audit_list_filters_by_actor_and_event_type() {
    let db = setup().await;
    let repo = SurrealAuditLogRepository::new(db);
    let actor_a = Uuid::new_v4();
    let actor_b = Uuid::new_v4();

    repo.append(audit_input(actor_a, AuditEventType::UserLogin))
        .await
        .unwrap();
    repo.append(audit_input(actor_a, AuditEventType::SessionEvicted))
        .await
        .unwrap();
    repo.append(audit_input(actor_b, AuditEventType::UserLogin))
        .await
        .unwrap();

    let by_actor = repo
        .list(
            AuditLogFilter {
                actor_id: Some(actor_a),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_actor.total, 2);

    let by_both = repo
        .list(
            AuditLogFilter {
                actor_id: Some(actor_a),
                event_type: Some(AuditEventType::SessionEvicted),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_both.total, 1);
    assert_eq!(by_both.items[0].event_type, AuditEventType::SessionEvicted);
}

#[tokio::test]
async fn audit_list_filters_by_time_window() {
    let db = setup().await;
    let repo = SurrealAuditLogRepository::new(db);
    let actor = Uuid::new_v4();

    let entry = repo
        .append(audit_input(actor, AuditEventType::DelegateAccess))
        .await
        .unwrap();

    let inside = repo
        .list(
            AuditLogFilter {
                from: Some(entry.timestamp - Duration::minutes(1)),
                to: Some(entry.timestamp + Duration::minutes(1)),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(inside.total, 1);

    let outside = repo
        .list(
            AuditLogFilter {
                to: Some(entry.timestamp - Duration::hours(1)),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(outside.total, 0);
}
