//! Grants read from a table in one of the configured databases.

use crate::error::QueryError;
use crate::ident::{Identifier, IdentifierKind, ValidatedTable};
use crate::registry::ConnectionRegistry;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use vista_core::GrantTableConfig;
use vista_policy::{AccessError, GrantStore, TableGrant};

/// Reads `(database, table)` rows for a principal on every call.
pub struct PgGrantStore {
    registry: Arc<ConnectionRegistry>,
    database: String,
    sql: String,
}

impl PgGrantStore {
    pub fn new(registry: Arc<ConnectionRegistry>, config: &GrantTableConfig) -> Result<Self, QueryError> {
        registry.ensure_known(&config.database)?;
        let table = ValidatedTable::parse(&config.table)?;
        let principal = Identifier::new(&config.principal_column, IdentifierKind::Column)?;
        let database = Identifier::new(&config.database_column, IdentifierKind::Column)?;
        let table_column = Identifier::new(&config.table_column, IdentifierKind::Column)?;

        let sql = format!(
            "SELECT {}::text, {}::text FROM {} WHERE {}::text = $1",
            database.quoted(),
            table_column.quoted(),
            table.qualified(),
            principal.quoted()
        );

        Ok(Self {
            registry,
            database: config.database.clone(),
            sql,
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

#[async_trait]
impl GrantStore for PgGrantStore {
    async fn grants_for(&self, principal_id: &str) -> Result<HashSet<TableGrant>, AccessError> {
        let pool = self
            .registry
            .get_pool(&self.database)
            .await
            .map_err(|e| AccessError::GrantStore(e.to_string()))?;

        let rows: Vec<(String, String)> = sqlx::query_as(&self.sql)
            .bind(principal_id)
            .fetch_all(&pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to read access grants");
                AccessError::GrantStore(e.to_string())
            })?;

        Ok(rows
            .into_iter()
            .map(|(database, table)| TableGrant::new(database, &table))
            .collect())
    }
}
