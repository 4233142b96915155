//! Error types for the policy crate.

use thiserror::Error;

/// Errors raised while authorizing a request.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The principal holds no grant for the requested table.
    #[error("access denied to {database}:{table}")]
    AccessDenied { database: String, table: String },

    /// The grant source could not be read.
    #[error("failed to load access grants: {0}")]
    GrantStore(String),
}
