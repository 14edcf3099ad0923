//! SurrealDB implementation of [`AuditLogRepository`].
//!
//! Append-only: the `audit_log` table denies UPDATE and DELETE at the
//! schema level, so this repository only ever creates and reads.

use chrono::{DateTime, Utc};
use estatekit_core::error::EstateKitResult;
use estatekit_core::models::audit::{
    AuditEventType, AuditLogEntry, AuditSeverity, CreateAuditLogEntry,
};
use estatekit_core::repository::{AuditLogFilter, AuditLogRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AuditRow {
    event_type: String,
    severity: String,
    actor_id: String,
    resource_id: Option<String>,
    resource_type: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    details: serde_json::Value,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct AuditRowWithId {
    record_id: String,
    event_type: String,
    severity: String,
    actor_id: String,
    resource_id: Option<String>,
    resource_type: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    details: serde_json::Value,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn event_type_to_string(event_type: AuditEventType) -> &'static str {
    match event_type {
        AuditEventType::UserLogin => "UserLogin",
        AuditEventType::SessionEvicted => "SessionEvicted",
        AuditEventType::SessionValidationFailed => "SessionValidationFailed",
        AuditEventType::SessionRevoked => "SessionRevoked",
        AuditEventType::DelegateInvite => "DelegateInvite",
        AuditEventType::DelegateAccepted => "DelegateAccepted",
        AuditEventType::DelegateRevoked => "DelegateRevoked",
        AuditEventType::DelegateUpdated => "DelegateUpdated",
        AuditEventType::DelegateAccess => "DelegateAccess",
    }
}

fn parse_event_type(s: &str) -> Result<AuditEventType, DbError> {
    match s {
        "UserLogin" => Ok(AuditEventType::UserLogin),
        "SessionEvicted" => Ok(AuditEventType::SessionEvicted),
        "SessionValidationFailed" => Ok(AuditEventType::SessionValidationFailed),
        "SessionRevoked" => Ok(AuditEventType::SessionRevoked),
        "DelegateInvite" => Ok(AuditEventType::DelegateInvite),
        "DelegateAccepted" => Ok(AuditEventType::DelegateAccepted),
        "DelegateRevoked" => Ok(AuditEventType::DelegateRevoked),
        "DelegateUpdated" => Ok(AuditEventType::DelegateUpdated),
        "DelegateAccess" => Ok(AuditEventType::DelegateAccess),
        other => Err(DbError::Query(format!("unknown audit event type: {other}"))),
    }
}

fn severity_to_string(severity: AuditSeverity) -> &'static str {
    match severity {
        AuditSeverity::Info => "Info",
        AuditSeverity::Warning => "Warning",
        AuditSeverity::Error => "Error",
        AuditSeverity::Critical => "Critical",
    }
}

fn parse_severity(s: &str) -> Result<AuditSeverity, DbError> {
    match s {
        "Info" => Ok(AuditSeverity::Info),
        "Warning" => Ok(AuditSeverity::Warning),
        "Error" => Ok(AuditSeverity::Error),
        "Critical" => Ok(AuditSeverity::Critical),
        other => Err(DbError::Query(format!("unknown audit severity: {other}"))),
    }
}

fn assemble(
    id: Uuid,
    event_type: &str,
    severity: &str,
    actor_id: &str,
    resource_id: Option<String>,
    resource_type: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    details: serde_json::Value,
    timestamp: DateTime<Utc>,
) -> Result<AuditLogEntry, DbError> {
    let actor_id = Uuid::parse_str(actor_id)
        .map_err(|e| DbError::Query(format!("invalid actor UUID: {e}")))?;
    Ok(AuditLogEntry {
        id,
        event_type: parse_event_type(event_type)?,
        severity: parse_severity(severity)?,
        actor_id,
        resource_id,
        resource_type,
        ip_address,
        user_agent,
        details,
        timestamp,
    })
}

impl AuditRow {
    fn into_entry(self, id: Uuid) -> Result<AuditLogEntry, DbError> {
        assemble(
            id,
            &self.event_type,
            &self.severity,
            &self.actor_id,
            self.resource_id,
            self.resource_type,
            self.ip_address,
            self.user_agent,
            self.details,
            self.timestamp,
        )
    }
}

impl AuditRowWithId {
    fn try_into_entry(self) -> Result<AuditLogEntry, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        assemble(
            id,
            &self.event_type,
            &self.severity,
            &self.actor_id,
            self.resource_id,
            self.resource_type,
            self.ip_address,
            self.user_agent,
            self.details,
            self.timestamp,
        )
    }
}

fn filter_clauses(filter: &AuditLogFilter) -> Vec<&'static str> {
    let mut clauses = Vec::new();
    if filter.actor_id.is_some() {
        clauses.push("actor_id = $actor_id");
    }
    if filter.event_type.is_some() {
        clauses.push("event_type = $event_type");
    }
    if filter.from.is_some() {
        clauses.push("timestamp >= $from");
    }
    if filter.to.is_some() {
        clauses.push("timestamp <= $to");
    }
    clauses
}

/// SurrealDB implementation of the append-only audit log repository.
#[derive(Clone)]
pub struct SurrealAuditLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditLogRepository for SurrealAuditLogRepository<C> {
    async fn append(&self, input: CreateAuditLogEntry) -> EstateKitResult<AuditLogEntry> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('audit_log', $id) SET \
                 event_type = $event_type, \
                 severity = $severity, \
                 actor_id = $actor_id, \
                 resource_id = $resource_id, \
                 resource_type = $resource_type, \
                 ip_address = $ip_address, \
                 user_agent = $user_agent, \
                 details = $details",
            )
            .bind(("id", id_str.clone()))
            .bind(("event_type", event_type_to_string(input.event_type).to_string()))
            .bind(("severity", severity_to_string(input.severity).to_string()))
            .bind(("actor_id", input.actor_id.to_string()))
            .bind(("resource_id", input.resource_id))
            .bind(("resource_type", input.resource_type))
            .bind(("ip_address", input.ip_address))
            .bind(("user_agent", input.user_agent))
            .bind(("details", input.details))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<AuditRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "audit_log".into(),
            id: id_str,
        })?;

        Ok(row.into_entry(id)?)
    }

    async fn list(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> EstateKitResult<PaginatedResult<AuditLogEntry>> {
        let clauses = filter_clauses(&filter);
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let count_query =
            format!("SELECT count() AS total FROM audit_log{where_clause} GROUP ALL");
        let list_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM audit_log{where_clause} \
             ORDER BY timestamp ASC LIMIT $limit START $offset"
        );

        let mut count_builder = self.db.query(&count_query);
        let mut list_builder = self
            .db
            .query(&list_query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));

        if let Some(actor_id) = filter.actor_id {
            count_builder = count_builder.bind(("actor_id", actor_id.to_string()));
            list_builder = list_builder.bind(("actor_id", actor_id.to_string()));
        }
        if let Some(event_type) = filter.event_type {
            let s = event_type_to_string(event_type).to_string();
            count_builder = count_builder.bind(("event_type", s.clone()));
            list_builder = list_builder.bind(("event_type", s));
        }
        if let Some(from) = filter.from {
            count_builder = count_builder.bind(("from", from));
            list_builder = list_builder.bind(("from", from));
        }
        if let Some(to) = filter.to {
            count_builder = count_builder.bind(("to", to));
            list_builder = list_builder.bind(("to", to));
        }

        let mut count_result = count_builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = list_builder.await.map_err(DbError::from)?;
        let rows: Vec<AuditRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_entry())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
