//! Identifier validation.
//!
//! Identifiers cannot be bound as query parameters, so every schema, table
//! and column name that reaches query text must pass [`Identifier::new`]
//! first. Only bare ASCII identifiers are accepted; they are then quoted
//! verbatim.

use crate::error::QueryError;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use vista_core::TableReference;

/// Longest identifier accepted.
pub const MAX_IDENTIFIER_LEN: usize = 128;

static BARE_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Schema,
    Table,
    Column,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdentifierKind::Schema => "schema",
            IdentifierKind::Table => "table",
            IdentifierKind::Column => "column",
        })
    }
}

/// Reject `name` unless it is a bare identifier of at most 128 characters.
pub fn validate(name: &str, kind: IdentifierKind) -> Result<(), QueryError> {
    if name.len() > MAX_IDENTIFIER_LEN || !BARE_IDENTIFIER.is_match(name) {
        return Err(QueryError::InvalidIdentifier {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// A name that passed [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: &str, kind: IdentifierKind) -> Result<Self, QueryError> {
        validate(name, kind)?;
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for query text.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A table whose schema and name are both validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedTable {
    pub schema: Identifier,
    pub table: Identifier,
}

impl ValidatedTable {
    pub fn new(reference: &TableReference) -> Result<Self, QueryError> {
        Ok(Self {
            schema: Identifier::new(&reference.schema, IdentifierKind::Schema)?,
            table: Identifier::new(&reference.table, IdentifierKind::Table)?,
        })
    }

    /// Split a combined `schema.table` string once and validate both halves.
    pub fn parse(full_name: &str) -> Result<Self, QueryError> {
        Self::new(&TableReference::parse(full_name))
    }

    /// `"schema"."table"` for query text.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.schema.quoted(), self.table.quoted())
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

impl fmt::Display for ValidatedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}
