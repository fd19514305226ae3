//! PostgreSQL connection settings loaded from environment variables.

use sqlx::postgres::PgPoolOptions;

use crate::{PostgresEntityStore, Result, StoreError};

/// Connection settings for [`PostgresEntityStore`].
///
/// Reads from environment variables:
/// - `DATABASE_URL`: connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Loads settings from the environment. Returns `None` when `DATABASE_URL` is unset.
    pub fn from_env() -> Option<Self> {
        let database_url = std::env::var("DATABASE_URL").ok()?;
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::DEFAULT_MAX_CONNECTIONS);
        Some(Self {
            database_url,
            max_connections,
        })
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Opens a pool and returns a store on top of it. Migrations are not run.
    pub async fn connect(&self) -> Result<PostgresEntityStore> {
        if self.max_connections == 0 {
            return Err(StoreError::Unavailable(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }

        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_url)
            .await?;

        tracing::info!(max_connections = self.max_connections, "connected to postgres");
        Ok(PostgresEntityStore::new(pool))
    }
}
