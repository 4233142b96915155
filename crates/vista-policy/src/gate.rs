//! Access control gate.
//!
//! Every fetch, export check and export runs through [`AccessGate::authorize`]
//! before a single query is issued.

use crate::error::AccessError;
use crate::grants::GrantStore;
use crate::quota::ExportQuota;
use std::sync::Arc;
use vista_core::{ExportPolicyConfig, Principal};

/// Authorization outcome for one (database, table) request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub quota: ExportQuota,
    pub is_admin: bool,
}

pub struct AccessGate {
    grants: Arc<dyn GrantStore>,
    policy: ExportPolicyConfig,
}

impl AccessGate {
    pub fn new(grants: Arc<dyn GrantStore>, policy: ExportPolicyConfig) -> Self {
        Self { grants, policy }
    }

    /// Decide whether `principal` may read `table` (`schema.table`) of `database`.
    pub async fn authorize(
        &self,
        principal: &Principal,
        database: &str,
        table: &str,
    ) -> Result<Decision, AccessError> {
        if principal.is_restricted() {
            let grants = self.grants.grants_for(&principal.id).await?;
            if !grants.iter().any(|g| g.matches(database, table)) {
                tracing::warn!(
                    principal = %principal.id,
                    role = %principal.role,
                    database = %database,
                    table = %table,
                    "Access denied: no grant for table"
                );
                return Err(AccessError::AccessDenied {
                    database: database.to_string(),
                    table: table.to_string(),
                });
            }
        }

        Ok(Decision {
            quota: ExportQuota::for_role(&self.policy, principal.role),
            is_admin: principal.is_admin(),
        })
    }

    /// Narrow a table listing to what `principal` may see.
    pub async fn visible_tables(
        &self,
        principal: &Principal,
        database: &str,
        tables: Vec<String>,
    ) -> Result<Vec<String>, AccessError> {
        if !principal.is_restricted() {
            return Ok(tables);
        }
        let grants = self.grants.grants_for(&principal.id).await?;
        Ok(tables
            .into_iter()
            .filter(|t| grants.iter().any(|g| g.matches(database, t)))
            .collect())
    }
}
