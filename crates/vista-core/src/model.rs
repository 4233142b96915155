//! Request and catalog types shared by the policy, query and server crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Principals
// =============================================================================

/// Role tier of an authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Elevated role: sees every table, highest export tier.
    Admin,
    /// Internal user: sees every table.
    Staff,
    /// External customer: restricted to explicit grants.
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "customer" => Ok(Role::Customer),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    /// Restricted principals only see tables they hold a grant for.
    pub fn is_restricted(&self) -> bool {
        self.role == Role::Customer
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// =============================================================================
// Tables and columns
// =============================================================================

/// A `schema.table` pair, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableReference {
    pub schema: String,
    pub table: String,
}

impl TableReference {
    /// Split a combined `schema.table` string at its first dot.
    /// A bare name lands in the `public` schema.
    pub fn parse(full_name: &str) -> Self {
        match full_name.split_once('.') {
            Some((schema, table)) => Self {
                schema: schema.to_string(),
                table: table.to_string(),
            },
            None => Self {
                schema: "public".to_string(),
                table: full_name.to_string(),
            },
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

impl fmt::Display for TableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// One column as reported by the database catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub is_primary_key: bool,
}

// =============================================================================
// Filters and sorting
// =============================================================================

/// Comparison operators accepted in a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Contains,
    Gt,
    Gte,
    Lt,
    Lte,
    Between,
}

impl Operator {
    /// Parse the wire name of an operator.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(Operator::Eq),
            "contains" => Some(Operator::Contains),
            "gt" => Some(Operator::Gt),
            "gte" => Some(Operator::Gte),
            "lt" => Some(Operator::Lt),
            "lte" => Some(Operator::Lte),
            "between" => Some(Operator::Between),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Contains => "contains",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Between => "between",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filter value: one scalar, or a `[low, high]` pair for `between`.
///
/// Numbers and booleans are accepted and carried as their text form; every
/// value is bound as a query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum FilterValue {
    Single(String),
    Range(String, String),
}

impl TryFrom<serde_json::Value> for FilterValue {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        fn scalar(v: Value) -> Result<String, String> {
            match v {
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(n.to_string()),
                Value::Bool(b) => Ok(b.to_string()),
                other => Err(format!("unsupported filter value: {}", other)),
            }
        }

        match value {
            Value::Array(items) => {
                let [low, high]: [Value; 2] = items
                    .try_into()
                    .map_err(|_| "a range filter value needs exactly two elements".to_string())?;
                Ok(FilterValue::Range(scalar(low)?, scalar(high)?))
            }
            other => Ok(FilterValue::Single(scalar(other)?)),
        }
    }
}

impl From<FilterValue> for serde_json::Value {
    fn from(value: FilterValue) -> Self {
        match value {
            FilterValue::Single(s) => serde_json::Value::String(s),
            FilterValue::Range(low, high) => serde_json::json!([low, high]),
        }
    }
}

/// One predicate of a WHERE clause, as supplied by a caller.
///
/// The operator stays a string here so that an unknown name is reported as
/// an invalid operator rather than a malformed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub column: String,
    pub operator: String,
    pub value: FilterValue,
}

impl FilterSpec {
    pub fn new(column: impl Into<String>, operator: impl Into<String>, value: FilterValue) -> Self {
        Self {
            column: column.into(),
            operator: operator.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}
