//! Access grant source configuration.
//!
//! Restricted principals only see the (database, table) pairs granted to
//! them. Grants live either inline in the config file or in a table of one
//! of the browsable databases.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where access grants are read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum GrantsConfig {
    /// Grants listed in the config file: `principal -> ["database:schema.table"]`.
    Static {
        #[serde(default)]
        principals: HashMap<String, Vec<String>>,
    },
    /// Grants read from a table on every request.
    Database(GrantTableConfig),
}

impl Default for GrantsConfig {
    fn default() -> Self {
        GrantsConfig::Static {
            principals: HashMap::new(),
        }
    }
}

/// Location and shape of the grant table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantTableConfig {
    /// Logical database (a key of `databases`) holding the grant table.
    pub database: String,

    /// Grant table as `schema.table`.
    #[serde(default = "default_grant_table")]
    pub table: String,

    #[serde(default = "default_principal_column")]
    pub principal_column: String,

    #[serde(default = "default_database_column")]
    pub database_column: String,

    #[serde(default = "default_table_column")]
    pub table_column: String,
}

fn default_grant_table() -> String {
    "public.user_table_access".to_string()
}

fn default_principal_column() -> String {
    "user_id".to_string()
}

fn default_database_column() -> String {
    "database_name".to_string()
}

fn default_table_column() -> String {
    "table_name".to_string()
}
