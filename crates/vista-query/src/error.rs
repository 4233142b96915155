//! Error types for the query crate.

use crate::ident::IdentifierKind;
use thiserror::Error;

/// Errors raised while planning, executing or exporting a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A schema, table or column name is not a bare identifier.
    #[error("invalid {kind} name '{name}'")]
    InvalidIdentifier { kind: IdentifierKind, name: String },

    /// A filter or sort column does not exist in the table.
    #[error("unknown column '{column}' in table {table}")]
    InvalidColumn { table: String, column: String },

    /// An unknown operator, or a value shape the operator cannot take.
    #[error("invalid operator '{operator}' on column '{column}': {reason}")]
    InvalidOperator {
        column: String,
        operator: String,
        reason: String,
    },

    /// A filter value the database could not convert to the column type.
    #[error("invalid filter value: {0}")]
    InvalidValue(String),

    /// The logical database name is not configured.
    #[error("database '{0}' is not configured")]
    DatabaseNotFound(String),

    /// The table does not exist or has no visible columns.
    #[error("table {table} not found in database '{database}'")]
    TableNotFound { database: String, table: String },

    /// The result is larger than the role's export tier allows.
    #[error("export of {total_count} rows exceeds the limit of {limit} rows for this role")]
    ExportQuotaExceeded { total_count: u64, limit: u64 },

    /// The result is larger than any role may export.
    #[error("export of {total_count} rows exceeds the maximum of {cap} rows")]
    ExportTooLarge { total_count: u64, cap: u64 },

    /// A cursor fetch or sink write failed mid-export; the transaction was rolled back.
    #[error("export stream failed: {0}")]
    StreamingFailure(String),

    /// Connectivity, pool exhaustion or any other database failure.
    #[error("upstream query failed: {0}")]
    Upstream(sqlx::Error),
}

impl QueryError {
    pub(crate) fn invalid_operator(
        column: &str,
        operator: &str,
        reason: impl Into<String>,
    ) -> Self {
        QueryError::InvalidOperator {
            column: column.to_string(),
            operator: operator.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(err: sqlx::Error) -> Self {
        // SQLSTATE class 22 (data exception): a bound value did not fit the column type.
        if let sqlx::Error::Database(db) = &err
            && db.code().is_some_and(|c| c.starts_with("22"))
        {
            return QueryError::InvalidValue(db.message().to_string());
        }
        QueryError::Upstream(err)
    }
}
