//! Connection bootstrap for the SurrealDB backend.
//!
//! All repositories share one WebSocket client; callers connect once
//! at startup and clone the handle into each repository.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

/// Where and how to reach the database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Host and port of the SurrealDB endpoint, without a scheme.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "estatekit".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// Holds the shared SurrealDB client for the lifetime of the process.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Open the WebSocket connection, sign in, and select the
    /// configured namespace and database.
    pub async fn connect(config: &DbConfig) -> Result<Self, surrealdb::Error> {
        let db = Surreal::new::<Ws>(&config.url).await?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "SurrealDB connection established"
        );

        Ok(Self { db })
    }

    /// The shared client; clone it into each repository.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
