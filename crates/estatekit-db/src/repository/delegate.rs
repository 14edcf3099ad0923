//! SurrealDB implementation of [`DelegateRepository`].
//!
//! The contact email is stored as its three encrypted components
//! (ciphertext, nonce, tag); permission grants are stored in their
//! serialized wire form (`{resource_type, access_level}` objects).

use chrono::{DateTime, Utc};
use estatekit_core::crypto::EncryptedValue;
use estatekit_core::error::EstateKitResult;
use estatekit_core::models::delegate::{
    CreateDelegate, Delegate, DelegateRole, DelegateStatus, PermissionGrant, UpdateDelegate,
};
use estatekit_core::repository::{DelegateRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct DelegateRow {
    owner_id: String,
    email_content: String,
    email_iv: String,
    email_auth_tag: String,
    role: String,
    status: String,
    expires_at: DateTime<Utc>,
    permissions: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct DelegateRowWithId {
    record_id: String,
    owner_id: String,
    email_content: String,
    email_iv: String,
    email_auth_tag: String,
    role: String,
    status: String,
    expires_at: DateTime<Utc>,
    permissions: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_role(s: &str) -> Result<DelegateRole, DbError> {
    match s {
        "executor" => Ok(DelegateRole::Executor),
        "healthcare_proxy" => Ok(DelegateRole::HealthcareProxy),
        "financial_advisor" => Ok(DelegateRole::FinancialAdvisor),
        "legal_advisor" => Ok(DelegateRole::LegalAdvisor),
        other => Err(DbError::Query(format!("unknown delegate role: {other}"))),
    }
}

fn role_to_string(role: DelegateRole) -> &'static str {
    match role {
        DelegateRole::Executor => "executor",
        DelegateRole::HealthcareProxy => "healthcare_proxy",
        DelegateRole::FinancialAdvisor => "financial_advisor",
        DelegateRole::LegalAdvisor => "legal_advisor",
    }
}

fn parse_status(s: &str) -> Result<DelegateStatus, DbError> {
    match s {
        "Pending" => Ok(DelegateStatus::Pending),
        "Active" => Ok(DelegateStatus::Active),
        "Expired" => Ok(DelegateStatus::Expired),
        "Revoked" => Ok(DelegateStatus::Revoked),
        other => Err(DbError::Query(format!("unknown delegate status: {other}"))),
    }
}

fn status_to_string(status: DelegateStatus) -> &'static str {
    match status {
        DelegateStatus::Pending => "Pending",
        DelegateStatus::Active => "Active",
        DelegateStatus::Expired => "Expired",
        DelegateStatus::Revoked => "Revoked",
    }
}

fn parse_permissions(value: serde_json::Value) -> Result<Vec<PermissionGrant>, DbError> {
    serde_json::from_value(value).map_err(|e| DbError::Query(format!("invalid permissions: {e}")))
}

fn permissions_to_value(grants: &[PermissionGrant]) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(grants).map_err(|e| DbError::Query(format!("serialize permissions: {e}")))
}

fn assemble(
    id: Uuid,
    owner_id: &str,
    email: EncryptedValue,
    role: &str,
    status: &str,
    expires_at: DateTime<Utc>,
    permissions: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Result<Delegate, DbError> {
    let owner_id = Uuid::parse_str(owner_id)
        .map_err(|e| DbError::Query(format!("invalid owner UUID: {e}")))?;
    Ok(Delegate {
        id,
        owner_id,
        email,
        role: parse_role(role)?,
        status: parse_status(status)?,
        expires_at,
        permissions: parse_permissions(permissions)?,
        created_at,
        updated_at,
    })
}

impl DelegateRow {
    fn into_delegate(self, id: Uuid) -> Result<Delegate, DbError> {
        assemble(
            id,
            &self.owner_id,
            EncryptedValue {
                content: self.email_content,
                iv: self.email_iv,
                auth_tag: self.email_auth_tag,
            },
            &self.role,
            &self.status,
            self.expires_at,
            self.permissions,
            self.created_at,
            self.updated_at,
        )
    }
}

impl DelegateRowWithId {
    fn try_into_delegate(self) -> Result<Delegate, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        assemble(
            id,
            &self.owner_id,
            EncryptedValue {
                content: self.email_content,
                iv: self.email_iv,
                auth_tag: self.email_auth_tag,
            },
            &self.role,
            &self.status,
            self.expires_at,
            self.permissions,
            self.created_at,
            self.updated_at,
        )
    }
}

/// SurrealDB implementation of the Delegate repository.
#[derive(Clone)]
pub struct SurrealDelegateRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDelegateRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> DelegateRepository for SurrealDelegateRepository<C> {
    async fn create(&self, input: CreateDelegate) -> EstateKitResult<Delegate> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let permissions = permissions_to_value(&input.permissions)?;

        let result = self
            .db
            .query(
                "CREATE type::record('delegate', $id) SET \
                 owner_id = $owner_id, \
                 email_content = $email_content, \
                 email_iv = $email_iv, \
                 email_auth_tag = $email_auth_tag, \
                 role = $role, \
                 status = $status, \
                 expires_at = $expires_at, \
                 permissions = $permissions",
            )
            .bind(("id", id_str.clone()))
            .bind(("owner_id", input.owner_id.to_string()))
            .bind(("email_content", input.email.content))
            .bind(("email_iv", input.email.iv))
            .bind(("email_auth_tag", input.email.auth_tag))
            .bind(("role", role_to_string(input.role).to_string()))
            .bind(("status", "Pending".to_string()))
            .bind(("expires_at", input.expires_at))
            .bind(("permissions", permissions))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<DelegateRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "delegate".into(),
            id: id_str,
        })?;

        Ok(row.into_delegate(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> EstateKitResult<Delegate> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('delegate', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DelegateRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "delegate".into(),
            id: id_str,
        })?;

        Ok(row.into_delegate(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateDelegate) -> EstateKitResult<Delegate> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.expires_at.is_some() {
            sets.push("expires_at = $expires_at");
        }
        if input.permissions.is_some() {
            sets.push("permissions = $permissions");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('delegate', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(status) = input.status {
            builder = builder.bind(("status", status_to_string(status).to_string()));
        }
        if let Some(expires_at) = input.expires_at {
            builder = builder.bind(("expires_at", expires_at));
        }
        if let Some(ref permissions) = input.permissions {
            builder = builder.bind(("permissions", permissions_to_value(permissions)?));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<DelegateRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "delegate".into(),
            id: id_str,
        })?;

        Ok(row.into_delegate(id)?)
    }

    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        pagination: Pagination,
    ) -> EstateKitResult<PaginatedResult<Delegate>> {
        let owner_id_str = owner_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM delegate \
                 WHERE owner_id = $owner_id GROUP ALL",
            )
            .bind(("owner_id", owner_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM delegate \
                 WHERE owner_id = $owner_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("owner_id", owner_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DelegateRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_delegate())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
