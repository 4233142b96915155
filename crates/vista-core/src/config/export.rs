//! Export quota and query paging configuration.

use crate::model::Role;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Row-count policy applied to bulk exports.
///
/// `absolute_cap` binds every role; `tier_limits` lowers it per role, and
/// roles without an entry fall back to `default_limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportPolicyConfig {
    /// Exports above this many rows need explicit confirmation from the user.
    #[serde(default = "default_warn_threshold")]
    pub warn_threshold: u64,

    /// Hard ceiling no role may exceed.
    #[serde(default = "default_absolute_cap")]
    pub absolute_cap: u64,

    /// Limit for roles missing from `tier_limits`.
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    /// Per-role export limits.
    #[serde(default = "default_tier_limits")]
    pub tier_limits: HashMap<Role, u64>,
}

impl Default for ExportPolicyConfig {
    fn default() -> Self {
        Self {
            warn_threshold: default_warn_threshold(),
            absolute_cap: default_absolute_cap(),
            default_limit: default_limit(),
            tier_limits: default_tier_limits(),
        }
    }
}

impl ExportPolicyConfig {
    /// Export limit for a role, never above the absolute cap.
    pub fn limit_for(&self, role: Role) -> u64 {
        self.tier_limits
            .get(&role)
            .copied()
            .unwrap_or(self.default_limit)
            .min(self.absolute_cap)
    }
}

/// Paging and cursor batch sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Upper bound on a caller-supplied page size.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Rows fetched per round-trip while streaming an export.
    #[serde(default = "default_export_batch_size")]
    pub export_batch_size: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            export_batch_size: default_export_batch_size(),
        }
    }
}

impl QueryConfig {
    /// Resolve a requested page size against the configured bounds.
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        match requested {
            Some(0) | None => self.default_page_size,
            Some(n) => n.min(self.max_page_size),
        }
    }
}

fn default_warn_threshold() -> u64 {
    2_000
}

fn default_absolute_cap() -> u64 {
    50_000
}

fn default_limit() -> u64 {
    10_000
}

fn default_tier_limits() -> HashMap<Role, u64> {
    HashMap::from([
        (Role::Admin, 50_000),
        (Role::Staff, 10_000),
        (Role::Customer, 10_000),
    ])
}

fn default_page_size() -> u32 {
    50
}

fn default_max_page_size() -> u32 {
    500
}

fn default_export_batch_size() -> u32 {
    1_000
}
