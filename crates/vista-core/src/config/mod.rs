//! Configuration types for Vista.
//!
//! A single YAML file describes the browsable databases, the export quota
//! policy, paging bounds, the grant source and the HTTP listener.
//!
//! ```yaml
//! databases:
//!   sales:
//!     database_url_env: SALES_DATABASE_URL
//!     pool:
//!       max_connections: 5
//! export:
//!   warn_threshold: 2000
//!   absolute_cap: 50000
//!   tier_limits:
//!     admin: 50000
//!     staff: 10000
//! grants:
//!   source: static
//!   principals:
//!     cust-7: ["sales:public.bookings"]
//! ```

pub mod database;
pub mod export;
pub mod grants;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub use database::{DatabaseConfig, PoolConfig};
pub use export::{ExportPolicyConfig, QueryConfig};
pub use grants::{GrantTableConfig, GrantsConfig};

/// Complete Vista configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VistaConfig {
    /// Logical database name -> connection settings.
    #[serde(default)]
    pub databases: HashMap<String, DatabaseConfig>,

    #[serde(default)]
    pub export: ExportPolicyConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub grants: GrantsConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            listen_port: default_listen_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    8080
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VistaConfig {
    /// Load and validate configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.databases.is_empty() {
            return Err(ConfigError::Config(
                "at least one database must be configured".to_string(),
            ));
        }

        let export = &self.export;
        if export.warn_threshold > export.absolute_cap {
            return Err(ConfigError::Config(format!(
                "export.warn_threshold ({}) exceeds export.absolute_cap ({})",
                export.warn_threshold, export.absolute_cap
            )));
        }
        if export.default_limit > export.absolute_cap {
            return Err(ConfigError::Config(format!(
                "export.default_limit ({}) exceeds export.absolute_cap ({})",
                export.default_limit, export.absolute_cap
            )));
        }
        for (role, limit) in &export.tier_limits {
            if *limit > export.absolute_cap {
                return Err(ConfigError::Config(format!(
                    "export.tier_limits.{} ({}) exceeds export.absolute_cap ({})",
                    role, limit, export.absolute_cap
                )));
            }
        }

        if self.query.default_page_size == 0 || self.query.export_batch_size == 0 {
            return Err(ConfigError::Config(
                "query.default_page_size and query.export_batch_size must be positive".to_string(),
            ));
        }

        if let GrantsConfig::Database(table) = &self.grants
            && !self.databases.contains_key(&table.database)
        {
            return Err(ConfigError::Config(format!(
                "grants.database '{}' is not a configured database",
                table.database
            )));
        }

        Ok(())
    }
}
