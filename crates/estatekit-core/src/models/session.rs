//! Session domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A server-held record binding an authenticated user to a device/IP
/// fingerprint for a bounded lifetime.
///
/// The `id` is the opaque session token handed to the client; sessions
/// are keyed by it directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: Uuid,
    /// Derived hash over parsed client/OS/device signals plus source IP.
    pub device_fingerprint: String,
    pub ip_address: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSession {
    pub id: String,
    pub user_id: Uuid,
    pub device_fingerprint: String,
    pub ip_address: String,
    pub expires_at: DateTime<Utc>,
}
