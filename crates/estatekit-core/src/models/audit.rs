//! Audit log domain model.
//!
//! Every access-control decision produces exactly one entry, written
//! synchronously before the decision is returned to the caller. The
//! log is append-only; retention is an external concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditEventType {
    UserLogin,
    SessionEvicted,
    SessionValidationFailed,
    SessionRevoked,
    DelegateInvite,
    DelegateAccepted,
    DelegateRevoked,
    DelegateUpdated,
    DelegateAccess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub event_type: AuditEventType,
    pub severity: AuditSeverity,
    pub actor_id: Uuid,
    pub resource_id: Option<String>,
    pub resource_type: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditLogEntry {
    pub event_type: AuditEventType,
    pub severity: AuditSeverity,
    pub actor_id: Uuid,
    pub resource_id: Option<String>,
    pub resource_type: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: serde_json::Value,
}
