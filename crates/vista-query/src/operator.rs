//! Operator compilation.
//!
//! Turns one filter into a WHERE fragment over bound parameters. The column
//! name in the fragment is a validated identifier; the user value only ever
//! travels as a parameter. `contains` wraps the value in `%` markers, which
//! is the only transformation applied to a value.

use crate::error::QueryError;
use crate::ident::Identifier;
use vista_core::{FilterSpec, FilterValue, Operator};

/// How a text parameter is compared against a column of a given type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCast {
    /// Cast the parameter to this type (`$1::bigint`).
    Typed(&'static str),
    /// Text-like column: compare directly.
    Text,
    /// Any other type: compare the column's text form (`"col"::text`).
    Coerced,
}

impl ValueCast {
    /// Pick a cast for an `information_schema` data type.
    pub fn for_data_type(data_type: &str) -> Self {
        match data_type {
            "smallint" | "integer" | "bigint" => ValueCast::Typed("bigint"),
            "numeric" | "decimal" => ValueCast::Typed("numeric"),
            "real" => ValueCast::Typed("real"),
            "double precision" => ValueCast::Typed("double precision"),
            "money" => ValueCast::Typed("money"),
            "boolean" => ValueCast::Typed("boolean"),
            "date" => ValueCast::Typed("date"),
            "timestamp with time zone" => ValueCast::Typed("timestamptz"),
            "timestamp without time zone" => ValueCast::Typed("timestamp"),
            "time without time zone" => ValueCast::Typed("time"),
            "uuid" => ValueCast::Typed("uuid"),
            "text" | "character varying" | "character" | "name" | "citext" => ValueCast::Text,
            _ => ValueCast::Coerced,
        }
    }

    fn column(&self, column: &Identifier) -> String {
        match self {
            ValueCast::Coerced => format!("{}::text", column.quoted()),
            _ => column.quoted(),
        }
    }

    fn param(&self, index: usize) -> String {
        match self {
            ValueCast::Typed(ty) => format!("${}::{}", index, ty),
            _ => format!("${}", index),
        }
    }
}

/// Rewrite applied to a value before it is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTransform {
    /// `%value%` for a substring match.
    Wildcards,
}

impl ValueTransform {
    pub fn apply(self, value: &str) -> String {
        match self {
            ValueTransform::Wildcards => format!("%{}%", value),
        }
    }
}

/// A compiled comparison and the value transform its parameters need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledOperator {
    pub fragment: String,
    /// Number of parameters the fragment consumes, starting at the given index.
    pub arity: usize,
    pub transform: Option<ValueTransform>,
}

/// Compile `operator` against `column`, numbering parameters from `param_index`.
pub fn compile(
    operator: Operator,
    column: &Identifier,
    cast: ValueCast,
    param_index: usize,
) -> CompiledOperator {
    let comparison = |symbol: &str| CompiledOperator {
        fragment: format!("{} {} {}", cast.column(column), symbol, cast.param(param_index)),
        arity: 1,
        transform: None,
    };

    match operator {
        Operator::Eq => comparison("="),
        Operator::Gt => comparison(">"),
        Operator::Gte => comparison(">="),
        Operator::Lt => comparison("<"),
        Operator::Lte => comparison("<="),
        // Always a textual match, including on numeric and date columns.
        Operator::Contains => CompiledOperator {
            fragment: format!("{}::text ILIKE ${}", column.quoted(), param_index),
            arity: 1,
            transform: Some(ValueTransform::Wildcards),
        },
        Operator::Between => CompiledOperator {
            fragment: format!(
                "{} BETWEEN {} AND {}",
                cast.column(column),
                cast.param(param_index),
                cast.param(param_index + 1)
            ),
            arity: 2,
            transform: None,
        },
    }
}

/// A filter ready to be ANDed into a WHERE clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFilter {
    pub fragment: String,
    pub params: Vec<String>,
}

/// Compile one filter whose column is already known to exist.
pub fn compile_filter(
    filter: &FilterSpec,
    column: &Identifier,
    cast: ValueCast,
    param_index: usize,
) -> Result<CompiledFilter, QueryError> {
    let operator = parse_operator(filter)?;
    let compiled = compile(operator, column, cast, param_index);

    let values: Vec<&str> = match (&filter.value, compiled.arity) {
        (FilterValue::Single(v), 1) => vec![v.as_str()],
        (FilterValue::Range(low, high), 2) => vec![low.as_str(), high.as_str()],
        (FilterValue::Single(_), _) => {
            return Err(QueryError::invalid_operator(
                &filter.column,
                &filter.operator,
                "expects a [low, high] pair",
            ));
        }
        (FilterValue::Range(..), _) => {
            return Err(QueryError::invalid_operator(
                &filter.column,
                &filter.operator,
                "expects a single value",
            ));
        }
    };

    let params = values
        .into_iter()
        .map(|v| match compiled.transform {
            Some(transform) => transform.apply(v),
            None => v.to_string(),
        })
        .collect();

    Ok(CompiledFilter {
        fragment: compiled.fragment,
        params,
    })
}

/// Parse the wire name of a filter's operator.
pub fn parse_operator(filter: &FilterSpec) -> Result<Operator, QueryError> {
    Operator::parse(&filter.operator).ok_or_else(|| {
        QueryError::invalid_operator(&filter.column, &filter.operator, "unknown operator")
    })
}
