//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. The session manager owns
//! session records exclusively; no other component mutates them.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::EstateKitResult;
use crate::models::{
    audit::{AuditEventType, AuditLogEntry, CreateAuditLogEntry},
    delegate::{CreateDelegate, Delegate, UpdateDelegate},
    session::{CreateSession, Session},
    user::{CreateUser, UserProfile},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = EstateKitResult<UserProfile>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = EstateKitResult<UserProfile>> + Send;
    fn get_by_subject(
        &self,
        subject: &str,
    ) -> impl Future<Output = EstateKitResult<UserProfile>> + Send;
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: CreateSession) -> impl Future<Output = EstateKitResult<Session>> + Send;
    fn get(&self, id: &str) -> impl Future<Output = EstateKitResult<Session>> + Send;
    /// Refresh `last_accessed_at`.
    fn touch(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = EstateKitResult<()>> + Send;
    /// Delete a session. Deleting an absent session is a silent success.
    fn delete(&self, id: &str) -> impl Future<Output = EstateKitResult<()>> + Send;
    /// All sessions for a user, oldest `created_at` first. This ordering
    /// is what makes eviction FIFO by creation order.
    fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = EstateKitResult<Vec<Session>>> + Send;
    fn count_for_user(&self, user_id: Uuid) -> impl Future<Output = EstateKitResult<u64>> + Send;
    /// Remove sessions whose `last_accessed_at` is before `cutoff`.
    /// Returns the number removed.
    fn delete_inactive(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = EstateKitResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Delegates
// ---------------------------------------------------------------------------

pub trait DelegateRepository: Send + Sync {
    fn create(
        &self,
        input: CreateDelegate,
    ) -> impl Future<Output = EstateKitResult<Delegate>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = EstateKitResult<Delegate>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateDelegate,
    ) -> impl Future<Output = EstateKitResult<Delegate>> + Send;
    fn list_for_owner(
        &self,
        owner_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = EstateKitResult<PaginatedResult<Delegate>>> + Send;
}

// ---------------------------------------------------------------------------
// Audit (append-only)
// ---------------------------------------------------------------------------

/// Query filters for audit log entries.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub actor_id: Option<Uuid>,
    pub event_type: Option<AuditEventType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub trait AuditLogRepository: Send + Sync {
    /// Append a new audit log entry. No update or delete operations exist.
    fn append(
        &self,
        input: CreateAuditLogEntry,
    ) -> impl Future<Output = EstateKitResult<AuditLogEntry>> + Send;
    fn list(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> impl Future<Output = EstateKitResult<PaginatedResult<AuditLogEntry>>> + Send;
}
