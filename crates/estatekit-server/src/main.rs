//! Estate Kit Server — application entry point.
//!
//! Wires the SurrealDB-backed repositories into the session manager and
//! runs the periodic expired-session sweep until shutdown.

use std::time::Duration;

use estatekit_auth::{JwtIdentityProvider, SessionConfig, SessionService};
use estatekit_core::metrics::PrometheusMetrics;
use estatekit_db::repository::{
    SurrealAuditLogRepository, SurrealSessionRepository, SurrealUserRepository,
};
use estatekit_db::{DbConfig, DbManager, run_migrations};
use tracing_subscriber::EnvFilter;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn db_config_from_env() -> DbConfig {
    DbConfig {
        url: env_or("ESTATEKIT_DB_URL", "127.0.0.1:8000"),
        namespace: env_or("ESTATEKIT_DB_NAMESPACE", "estatekit"),
        database: env_or("ESTATEKIT_DB_DATABASE", "main"),
        username: env_or("ESTATEKIT_DB_USERNAME", "root"),
        password: env_or("ESTATEKIT_DB_PASSWORD", "root"),
    }
}

fn session_config_from_env() -> Result<SessionConfig, Box<dyn std::error::Error>> {
    let defaults = SessionConfig::default();
    let jwt_public_key_pem = match std::env::var("ESTATEKIT_JWT_PUBLIC_KEY_FILE") {
        Ok(path) => std::fs::read_to_string(path)?,
        Err(_) => std::env::var("ESTATEKIT_JWT_PUBLIC_KEY")
            .map_err(|_| "ESTATEKIT_JWT_PUBLIC_KEY_FILE or ESTATEKIT_JWT_PUBLIC_KEY must be set")?,
    };
    Ok(SessionConfig {
        session_ttl_secs: env_parse("ESTATEKIT_SESSION_TTL_SECS", defaults.session_ttl_secs),
        max_sessions_per_user: env_parse(
            "ESTATEKIT_MAX_SESSIONS_PER_USER",
            defaults.max_sessions_per_user,
        ),
        dependency_timeout_secs: env_parse(
            "ESTATEKIT_DEPENDENCY_TIMEOUT_SECS",
            defaults.dependency_timeout_secs,
        ),
        jwt_public_key_pem,
        jwt_issuer: env_or("ESTATEKIT_JWT_ISSUER", &defaults.jwt_issuer),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("estatekit=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting Estate Kit server...");

    let db_config = db_config_from_env();
    let session_config = session_config_from_env()?;
    let sweep_interval = Duration::from_secs(env_parse("ESTATEKIT_SWEEP_INTERVAL_SECS", 300u64));

    let db = DbManager::connect(&db_config).await?;
    run_migrations(db.client()).await?;

    let users = SurrealUserRepository::new(db.client().clone());
    let sessions = SurrealSessionRepository::new(db.client().clone());
    let audit = SurrealAuditLogRepository::new(db.client().clone());
    let metrics = PrometheusMetrics::new()?;
    let identity = JwtIdentityProvider::new(users, session_config.clone());

    let session_service = SessionService::new(identity, sessions, audit, metrics, session_config);

    tracing::info!(
        sweep_interval_secs = sweep_interval.as_secs(),
        "Estate Kit server ready"
    );

    let mut interval = tokio::time::interval(sweep_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // First tick fires immediately; sweep once at startup.
    loop {
        tokio::select! {
            _ = interval.tick() => {
                match session_service.cleanup_expired_sessions().await {
                    Ok(removed) if removed > 0 => {
                        tracing::info!(removed, "Session sweep removed expired sessions");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "Session sweep failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    tracing::info!("Estate Kit server stopped.");
    Ok(())
}
