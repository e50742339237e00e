//! Database layer for the finder.
//!
//! This module provides:
//! - Connection pool management
//! - The Postgres-backed assignment table
//!
//! The database layer uses SQLx with Postgres.

mod error;
mod slot_table;

pub use error::DbError;
pub use slot_table::{PgSlotTable, TableName};

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL.
    pub database_url: String,

    /// Maximum number of connections in the pool.
    pub max_connections: u32,

    /// Minimum number of idle connections.
    pub min_connections: u32,

    /// Connection acquire timeout.
    pub acquire_timeout: Duration,

    /// Idle connection timeout.
    pub idle_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/slotpool".to_string(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

impl DbConfig {
    /// Load configuration from a key lookup (usually the environment).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_url = lookup("DATABASE_URL").unwrap_or(defaults.database_url);

        let max_connections = lookup("DB_MAX_CONNECTIONS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_connections);

        let min_connections = lookup("DB_MIN_CONNECTIONS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.min_connections);

        Self {
            database_url,
            max_connections,
            min_connections,
            ..defaults
        }
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect(&config.database_url)
            .await
            .map_err(DbError::Connect)?;

        info!("Database connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get an assignment table handle.
    pub fn slot_table(&self, table: TableName) -> PgSlotTable {
        PgSlotTable::new(self.pool.clone(), table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::from_lookup(|_| None);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.min_connections, 1);
    }

    #[test]
    fn test_db_config_ignores_garbage_numbers() {
        let config = DbConfig::from_lookup(|key| match key {
            "DB_MAX_CONNECTIONS" => Some("lots".to_string()),
            "DATABASE_URL" => Some("postgres://db/assign".to_string()),
            _ => None,
        });
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.database_url, "postgres://db/assign");
    }
}
