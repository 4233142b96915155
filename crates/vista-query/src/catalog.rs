//! Column catalog.
//!
//! Column sets are read from `information_schema` on every plan, so a column
//! added or dropped upstream is seen by the next request.

use crate::error::QueryError;
use crate::ident::ValidatedTable;
use crate::registry::ConnectionRegistry;
use async_trait::async_trait;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;
use vista_core::ColumnDescriptor;

/// Columns of one table, in ordinal order, with its primary key in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableColumns {
    pub columns: Vec<ColumnDescriptor>,
    pub primary_key: Vec<String>,
}

impl TableColumns {
    pub fn get(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

#[async_trait]
pub trait ColumnCatalog: Send + Sync {
    /// Columns of base table `table`; `TableNotFound` for views and for
    /// tables with no visible columns.
    async fn columns(
        &self,
        database: &str,
        table: &ValidatedTable,
    ) -> Result<TableColumns, QueryError>;

    /// Base tables outside system schemas, as `schema.table`.
    async fn tables(&self, database: &str) -> Result<Vec<String>, QueryError>;
}

/// Catalog backed by the database's own `information_schema`.
pub struct PgCatalog {
    registry: Arc<ConnectionRegistry>,
}

impl PgCatalog {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ColumnCatalog for PgCatalog {
    async fn columns(
        &self,
        database: &str,
        table: &ValidatedTable,
    ) -> Result<TableColumns, QueryError> {
        let pool = self.registry.get_pool(database).await?;

        let primary_key: Vec<String> = sqlx::query_scalar(
            r#"
            select kcu.column_name::text
            from information_schema.table_constraints tc
            join information_schema.key_column_usage kcu
              on tc.constraint_name = kcu.constraint_name
             and tc.table_schema = kcu.table_schema
             and tc.table_name = kcu.table_name
            where tc.constraint_type = 'PRIMARY KEY'
              and tc.table_schema = $1
              and tc.table_name = $2
            order by kcu.ordinal_position
            "#,
        )
        .bind(table.schema.as_str())
        .bind(table.table.as_str())
        .fetch_all(&pool)
        .await?;

        let rows = sqlx::query(
            r#"
            select c.column_name::text as column_name,
                   c.data_type::text as data_type,
                   c.is_nullable::text as is_nullable
            from information_schema.columns c
            join information_schema.tables t
              on t.table_schema = c.table_schema
             and t.table_name = c.table_name
            where c.table_schema = $1
              and c.table_name = $2
              and t.table_type = 'BASE TABLE'
            order by c.ordinal_position
            "#,
        )
        .bind(table.schema.as_str())
        .bind(table.table.as_str())
        .fetch_all(&pool)
        .await?;

        if rows.is_empty() {
            return Err(QueryError::TableNotFound {
                database: database.to_string(),
                table: table.full_name(),
            });
        }

        let columns = rows
            .into_iter()
            .map(|row| {
                let name: String = row.get("column_name");
                let is_nullable: String = row.get("is_nullable");
                ColumnDescriptor {
                    is_primary_key: primary_key.contains(&name),
                    data_type: row.get("data_type"),
                    nullable: is_nullable == "YES",
                    name,
                }
            })
            .collect();

        Ok(TableColumns {
            columns,
            primary_key,
        })
    }

    async fn tables(&self, database: &str) -> Result<Vec<String>, QueryError> {
        let pool = self.registry.get_pool(database).await?;
        let tables = sqlx::query_scalar(
            r#"
            select (table_schema || '.' || table_name)::text
            from information_schema.tables
            where table_type = 'BASE TABLE'
              and table_schema not in ('pg_catalog', 'information_schema')
            order by table_schema, table_name
            "#,
        )
        .fetch_all(&pool)
        .await?;
        Ok(tables)
    }
}

/// Fixed in-memory catalog, keyed by `(database, schema.table)`.
#[derive(Debug, Default, Clone)]
pub struct StaticCatalog {
    tables: HashMap<(String, String), TableColumns>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table. `columns` are `(name, data_type)` pairs; `primary_key` lists key columns.
    pub fn with_table(
        mut self,
        database: &str,
        table: &str,
        columns: &[(&str, &str)],
        primary_key: &[&str],
    ) -> Self {
        let columns = columns
            .iter()
            .map(|(name, data_type)| ColumnDescriptor {
                name: name.to_string(),
                data_type: data_type.to_string(),
                nullable: !primary_key.contains(name),
                is_primary_key: primary_key.contains(name),
            })
            .collect();
        self.tables.insert(
            (database.to_string(), table.to_string()),
            TableColumns {
                columns,
                primary_key: primary_key.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }
}

#[async_trait]
impl ColumnCatalog for StaticCatalog {
    async fn columns(
        &self,
        database: &str,
        table: &ValidatedTable,
    ) -> Result<TableColumns, QueryError> {
        self.tables
            .get(&(database.to_string(), table.full_name()))
            .cloned()
            .ok_or_else(|| QueryError::TableNotFound {
                database: database.to_string(),
                table: table.full_name(),
            })
    }

    async fn tables(&self, database: &str) -> Result<Vec<String>, QueryError> {
        let mut tables: Vec<String> = self
            .tables
            .keys()
            .filter(|(db, _)| db == database)
            .map(|(_, table)| table.clone())
            .collect();
        tables.sort();
        Ok(tables)
    }
}
