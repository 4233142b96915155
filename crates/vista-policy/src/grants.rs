//! Access grants for restricted principals.

use crate::error::AccessError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use vista_core::TableReference;

/// Permission for one principal to browse one table of one database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableGrant {
    pub database: String,
    /// Normalized `schema.table`.
    pub table: String,
}

impl TableGrant {
    pub fn new(database: impl Into<String>, table: &str) -> Self {
        Self {
            database: database.into(),
            table: TableReference::parse(table).full_name(),
        }
    }

    /// Parse the `database:schema.table` form used in configuration.
    pub fn parse(entry: &str) -> Option<Self> {
        let (database, table) = entry.split_once(':')?;
        if database.is_empty() || table.is_empty() {
            return None;
        }
        Some(Self::new(database, table))
    }

    pub fn matches(&self, database: &str, table: &str) -> bool {
        self.database == database && self.table == TableReference::parse(table).full_name()
    }
}

/// Source of access grants, consulted on every request.
#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn grants_for(&self, principal_id: &str) -> Result<HashSet<TableGrant>, AccessError>;
}

/// Grants fixed at startup from the config file.
#[derive(Debug, Default)]
pub struct StaticGrantStore {
    grants: HashMap<String, HashSet<TableGrant>>,
}

impl StaticGrantStore {
    /// Build from `principal -> ["database:schema.table"]`, skipping malformed entries.
    pub fn from_entries(principals: &HashMap<String, Vec<String>>) -> Self {
        let mut grants = HashMap::new();
        for (principal, entries) in principals {
            let set: HashSet<TableGrant> = entries
                .iter()
                .filter_map(|e| {
                    let grant = TableGrant::parse(e);
                    if grant.is_none() {
                        tracing::warn!(principal = %principal, entry = %e, "Ignoring malformed grant entry");
                    }
                    grant
                })
                .collect();
            grants.insert(principal.clone(), set);
        }
        Self { grants }
    }
}

#[async_trait]
impl GrantStore for StaticGrantStore {
    async fn grants_for(&self, principal_id: &str) -> Result<HashSet<TableGrant>, AccessError> {
        Ok(self.grants.get(principal_id).cloned().unwrap_or_default())
    }
}
