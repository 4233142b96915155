//! # vista-query
//!
//! Read-only dynamic queries over configured Postgres databases.
//!
//! ## Pipeline
//!
//! ```text
//! QueryRequest
//!       │
//!       ▼
//! ┌──────────────────────┐
//! │ 1. Validate names    │  ← ident (allow-list, no connection)
//! │ 2. Check operators   │
//! │ 3. Load columns      │  ← catalog (information_schema)
//! │ 4. Reject unknown    │
//! │    columns           │
//! │ 5. Compile filters   │  ← operator (placeholders only)
//! └──────────┬───────────┘
//!            ▼
//!        QueryPlan ──► executor (count + page)
//!                  └─► export (count, quota, cursor → CSV)
//! ```
//!
//! Identifiers reach SQL text only after validation and quoting. Values are
//! always bound parameters.

pub mod catalog;
pub mod csv;
pub mod error;
pub mod executor;
pub mod export;
pub mod grant_store;
pub mod ident;
pub mod operator;
pub mod plan;
pub mod registry;

pub use catalog::{ColumnCatalog, PgCatalog, StaticCatalog, TableColumns};
pub use csv::CsvEncoder;
pub use error::QueryError;
pub use executor::{PageResult, QueryExecutor};
pub use export::{ChannelSink, ExportCursor, ExportSink, ExportStreamer};
pub use grant_store::PgGrantStore;
pub use ident::{Identifier, IdentifierKind, ValidatedTable};
pub use plan::{QueryPlan, QueryPlanner, QueryRequest};
pub use registry::ConnectionRegistry;
