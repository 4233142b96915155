//! Connection registry.
//!
//! One lazily connected pool per configured database. The set of databases
//! is fixed when the registry is built; only the pools inside are created on
//! first use, and a concurrent first access has a single winner.

use crate::error::QueryError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use vista_core::{DatabaseConfig, VistaConfig};

struct PoolSlot {
    config: DatabaseConfig,
    pool: OnceCell<PgPool>,
}

pub struct ConnectionRegistry {
    slots: HashMap<String, PoolSlot>,
}

impl ConnectionRegistry {
    pub fn new(databases: HashMap<String, DatabaseConfig>) -> Self {
        let slots = databases
            .into_iter()
            .map(|(name, config)| {
                (
                    name,
                    PoolSlot {
                        config,
                        pool: OnceCell::new(),
                    },
                )
            })
            .collect();
        Self { slots }
    }

    pub fn from_config(config: &VistaConfig) -> Self {
        Self::new(config.databases.clone())
    }

    pub fn contains(&self, database: &str) -> bool {
        self.slots.contains_key(database)
    }

    /// Configured database names, sorted.
    pub fn database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.keys().cloned().collect();
        names.sort();
        names
    }

    /// Fail with `DatabaseNotFound` unless `database` is configured. Connects nothing.
    pub fn ensure_known(&self, database: &str) -> Result<(), QueryError> {
        if self.contains(database) {
            Ok(())
        } else {
            Err(QueryError::DatabaseNotFound(database.to_string()))
        }
    }

    /// Pool for `database`, connecting it on first use.
    pub async fn get_pool(&self, database: &str) -> Result<PgPool, QueryError> {
        let slot = self
            .slots
            .get(database)
            .ok_or_else(|| QueryError::DatabaseNotFound(database.to_string()))?;

        let pool = slot
            .pool
            .get_or_try_init(|| connect(database, &slot.config))
            .await?;
        Ok(pool.clone())
    }

    /// Close every pool that was created. Further `get_pool` calls return closed pools.
    pub async fn shutdown(&self) {
        for (name, slot) in &self.slots {
            if let Some(pool) = slot.pool.get() {
                pool.close().await;
                tracing::info!(database = %name, "Closed connection pool");
            }
        }
    }
}

async fn connect(database: &str, config: &DatabaseConfig) -> Result<PgPool, QueryError> {
    let pool_config = &config.pool;
    let pool = PgPoolOptions::new()
        .max_connections(pool_config.max_connections)
        .min_connections(pool_config.min_connections)
        .acquire_timeout(Duration::from_secs(pool_config.acquire_timeout_seconds))
        .idle_timeout(Duration::from_secs(pool_config.idle_timeout_seconds))
        .connect(&config.connection_string())
        .await
        .map_err(|e| {
            tracing::error!(database = %database, error = %e, "Failed to connect");
            QueryError::Upstream(e)
        })?;

    tracing::info!(
        database = %database,
        max_connections = pool_config.max_connections,
        "Created connection pool"
    );
    Ok(pool)
}
