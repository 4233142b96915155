//! Browsable database configuration.
//!
//! Each entry under `databases:` names one Postgres database that users may
//! browse. A connection target can be given three ways:
//! 1. `database_url_env` - reference an environment variable
//! 2. `database_url` - provide the URL directly
//! 3. Individual fields (host, port, database, username, password)

use serde::{Deserialize, Serialize};

/// Connection settings for one logical database.
///
/// Precedence when building the connection string:
/// 1. Environment variable containing the full connection URL
/// 2. Direct connection URL
/// 3. Individual connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Environment variable name containing the PostgreSQL connection URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url_env: Option<String>,

    /// Full PostgreSQL connection URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Physical database name on the server.
    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable containing the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Connection pool configuration.
    #[serde(default)]
    pub pool: PoolConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url_env: None,
            database_url: None,
            host: default_host(),
            port: default_port(),
            database: default_database(),
            username: default_username(),
            password: None,
            password_env: None,
            pool: PoolConfig::default(),
        }
    }
}

/// Connection pool bounds for one database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of concurrent connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connections kept open even when idle.
    #[serde(default)]
    pub min_connections: u32,

    /// Timeout in seconds when acquiring a connection.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,

    /// How long a connection can remain idle before being closed.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: 0,
            acquire_timeout_seconds: default_acquire_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

impl DatabaseConfig {
    /// Build a PostgreSQL connection string from this configuration.
    ///
    /// Credentials and the database name are percent-encoded when built from
    /// individual fields; URLs are passed through untouched.
    pub fn connection_string(&self) -> String {
        if let Some(env_var) = &self.database_url_env
            && let Ok(url) = std::env::var(env_var)
        {
            return url;
        }

        if let Some(url) = &self.database_url {
            return url.clone();
        }

        let username = urlencoding::encode(&self.username);
        let database = urlencoding::encode(&self.database);
        match self.get_password() {
            Some(password) => format!(
                "postgresql://{}:{}@{}:{}/{}",
                username,
                urlencoding::encode(&password),
                self.host,
                self.port,
                database
            ),
            None => format!(
                "postgresql://{}@{}:{}/{}",
                username, self.host, self.port, database
            ),
        }
    }

    fn get_password(&self) -> Option<String> {
        if let Some(env_var) = &self.password_env
            && let Ok(password) = std::env::var(env_var)
        {
            return Some(password);
        }
        self.password.clone()
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_database() -> String {
    "postgres".to_string()
}

fn default_username() -> String {
    "postgres".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}
