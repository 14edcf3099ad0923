//! SurrealDB implementation of [`SessionRepository`].
//!
//! Sessions are keyed by the opaque session token, so lookups and
//! deletes address a single record and never rewrite a user's whole
//! session set — the per-user "index" is the `user_id` column index.

use chrono::{DateTime, Utc};
use estatekit_core::error::EstateKitResult;
use estatekit_core::models::session::{CreateSession, Session};
use estatekit_core::repository::SessionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SessionRow {
    user_id: String,
    device_fingerprint: String,
    ip_address: String,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct SessionRowWithId {
    record_id: String,
    user_id: String,
    device_fingerprint: String,
    ip_address: String,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

fn row_to_session(row: SessionRow, id: String) -> Result<Session, DbError> {
    let user_id = Uuid::parse_str(&row.user_id)
        .map_err(|e| DbError::Query(format!("invalid user UUID: {e}")))?;
    Ok(Session {
        id,
        user_id,
        device_fingerprint: row.device_fingerprint,
        ip_address: row.ip_address,
        created_at: row.created_at,
        last_accessed_at: row.last_accessed_at,
        expires_at: row.expires_at,
    })
}

impl SessionRowWithId {
    fn try_into_session(self) -> Result<Session, DbError> {
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Query(format!("invalid user UUID: {e}")))?;
        Ok(Session {
            id: self.record_id,
            user_id,
            device_fingerprint: self.device_fingerprint,
            ip_address: self.ip_address,
            created_at: self.created_at,
            last_accessed_at: self.last_accessed_at,
            expires_at: self.expires_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Session repository.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn create(&self, input: CreateSession) -> EstateKitResult<Session> {
        let id = input.id.clone();

        let result = self
            .db
            .query(
                "CREATE type::record('session', $id) SET \
                 user_id = $user_id, \
                 device_fingerprint = $device_fingerprint, \
                 ip_address = $ip_address, \
                 expires_at = $expires_at",
            )
            .bind(("id", id.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("device_fingerprint", input.device_fingerprint))
            .bind(("ip_address", input.ip_address))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: id.clone(),
        })?;

        row_to_session(row, id).map_err(Into::into)
    }

    async fn get(&self, id: &str) -> EstateKitResult<Session> {
        let id_owned = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('session', $id)")
            .bind(("id", id_owned.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: id_owned.clone(),
        })?;

        row_to_session(row, id_owned).map_err(Into::into)
    }

    async fn touch(&self, id: &str, at: DateTime<Utc>) -> EstateKitResult<()> {
        self.db
            .query("UPDATE type::record('session', $id) SET last_accessed_at = $at")
            .bind(("id", id.to_string()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> EstateKitResult<()> {
        // Deleting an absent record is a no-op in SurrealDB, which
        // gives us revocation idempotency for free.
        self.db
            .query("DELETE type::record('session', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> EstateKitResult<Vec<Session>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM session \
                 WHERE user_id = $user_id \
                 ORDER BY created_at ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRowWithId> = result.take(0).map_err(DbError::from)?;

        let sessions = rows
            .into_iter()
            .map(|row| row.try_into_session())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(sessions)
    }

    async fn count_for_user(&self, user_id: Uuid) -> EstateKitResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM session \
                 WHERE user_id = $user_id GROUP ALL",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn delete_inactive(&self, cutoff: DateTime<Utc>) -> EstateKitResult<u64> {
        // Count stale sessions first, then delete.
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM session \
                 WHERE last_accessed_at < $cutoff GROUP ALL",
            )
            .bind(("cutoff", cutoff))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query("DELETE session WHERE last_accessed_at < $cutoff")
            .bind(("cutoff", cutoff))
            .await
            .map_err(DbError::from)?;

        Ok(total)
    }
}
