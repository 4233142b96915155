//! # vista-core
//!
//! Configuration and shared request types for Vista, a read-only browser
//! and bulk exporter over admin-configured Postgres databases.

// Configuration types shared across all Vista crates
pub mod config;
pub mod model;

pub use config::{
    ConfigError, DatabaseConfig, ExportPolicyConfig, GrantTableConfig, GrantsConfig, PoolConfig,
    QueryConfig, ServerConfig, VistaConfig,
};
pub use model::{
    ColumnDescriptor, FilterSpec, FilterValue, Operator, Principal, Role, SortDirection, SortSpec,
    TableReference,
};
