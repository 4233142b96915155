//! Query planning.
//!
//! A [`QueryPlan`] is built only after every identifier has been validated,
//! every operator recognised and every referenced column found in the
//! table's catalog entry. Its SQL text contains quoted identifiers and
//! numbered placeholders, never a user value.

use crate::catalog::{ColumnCatalog, TableColumns};
use crate::error::QueryError;
use crate::ident::{Identifier, IdentifierKind, ValidatedTable};
use crate::operator::{self, CompiledFilter, ValueCast};
use sqlx::Arguments;
use sqlx::postgres::PgArguments;
use std::sync::Arc;
use vista_core::{FilterSpec, SortSpec};

/// Row alias used to turn each selected row into one JSON object.
const ROW_ALIAS: &str = "__row";

/// Physical row identity, used for ordering when a table has no primary key.
const ROW_IDENTITY: &str = "ctid";

/// Column types whose JSON number form would not survive an `f64` round trip.
fn renders_as_text(data_type: &str) -> bool {
    matches!(data_type, "numeric" | "decimal")
}

/// One read request against one table.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// `schema.table`; a bare name means `public`.
    pub table: String,
    pub filters: Vec<FilterSpec>,
    pub sort: Option<SortSpec>,
    /// 1-based; clamped into range at execution.
    pub page: u32,
    pub page_size: u32,
}

impl QueryRequest {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            sort: None,
            page: 1,
            page_size: 50,
        }
    }

    pub fn with_filters(mut self, filters: Vec<FilterSpec>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_sort(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }
}

/// A validated, immutable description of one read.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub database: String,
    pub table: ValidatedTable,
    pub columns: TableColumns,
    row_json: String,
    filters: Vec<CompiledFilter>,
    order_by: Vec<String>,
    pub page: u32,
    pub page_size: u32,
}

impl QueryPlan {
    fn where_clause(&self) -> String {
        if self.filters.is_empty() {
            return String::new();
        }
        let fragments: Vec<&str> = self.filters.iter().map(|f| f.fragment.as_str()).collect();
        format!(" WHERE {}", fragments.join(" AND "))
    }

    fn select_rows(&self) -> String {
        format!(
            "SELECT {row} AS row FROM {table} AS {alias}{filter} ORDER BY {order}",
            row = self.row_json,
            alias = ROW_ALIAS,
            table = self.table.qualified(),
            filter = self.where_clause(),
            order = self.order_by.join(", "),
        )
    }

    /// Filter parameters in placeholder order.
    pub fn params(&self) -> Vec<&str> {
        self.filters
            .iter()
            .flat_map(|f| f.params.iter().map(String::as_str))
            .collect()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.names().map(str::to_string).collect()
    }

    pub fn count_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM {}{}",
            self.table.qualified(),
            self.where_clause()
        )
    }

    /// Bounded page query; LIMIT and OFFSET follow the filter parameters.
    pub fn page_sql(&self) -> String {
        let next = self.params().len() + 1;
        format!(
            "{} LIMIT ${} OFFSET ${}",
            self.select_rows(),
            next,
            next + 1
        )
    }

    /// Unbounded, filtered and ordered query for cursor streaming.
    pub fn full_sql(&self) -> String {
        self.select_rows()
    }

    /// Arguments for [`count_sql`](Self::count_sql) and [`full_sql`](Self::full_sql).
    pub fn arguments(&self) -> Result<PgArguments, QueryError> {
        let mut args = PgArguments::default();
        for param in self.params() {
            args.add(param.to_string())
                .map_err(|e| QueryError::Upstream(sqlx::Error::Encode(e)))?;
        }
        Ok(args)
    }

    /// Arguments for [`page_sql`](Self::page_sql) at `page` (1-based).
    pub fn page_arguments(&self, page: u32) -> Result<PgArguments, QueryError> {
        let mut args = self.arguments()?;
        let limit = i64::from(self.page_size);
        let offset = i64::from(page.saturating_sub(1)) * limit;
        args.add(limit)
            .map_err(|e| QueryError::Upstream(sqlx::Error::Encode(e)))?;
        args.add(offset)
            .map_err(|e| QueryError::Upstream(sqlx::Error::Encode(e)))?;
        Ok(args)
    }
}

pub struct QueryPlanner {
    catalog: Arc<dyn ColumnCatalog>,
}

impl QueryPlanner {
    pub fn new(catalog: Arc<dyn ColumnCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<dyn ColumnCatalog> {
        &self.catalog
    }

    /// Validate `request` and compile it against the table's current columns.
    pub async fn plan(&self, database: &str, request: &QueryRequest) -> Result<QueryPlan, QueryError> {
        // Everything checkable without a connection goes first.
        let table = ValidatedTable::parse(&request.table)?;
        let mut filter_columns = Vec::with_capacity(request.filters.len());
        for filter in &request.filters {
            filter_columns.push(Identifier::new(&filter.column, IdentifierKind::Column)?);
            operator::parse_operator(filter)?;
        }
        let sort_column = request
            .sort
            .as_ref()
            .map(|s| Identifier::new(&s.column, IdentifierKind::Column))
            .transpose()?;

        let columns = self.catalog.columns(database, &table).await?;

        let unknown = filter_columns
            .iter()
            .chain(sort_column.iter())
            .find(|c| columns.get(c.as_str()).is_none());
        if let Some(column) = unknown {
            tracing::warn!(
                database = %database,
                table = %table,
                column = %column,
                "Rejected unknown column"
            );
            return Err(QueryError::InvalidColumn {
                table: table.full_name(),
                column: column.to_string(),
            });
        }

        let mut filters = Vec::with_capacity(request.filters.len());
        let mut param_index = 1;
        for (filter, column) in request.filters.iter().zip(&filter_columns) {
            let cast = columns
                .get(column.as_str())
                .map(|c| ValueCast::for_data_type(&c.data_type))
                .unwrap_or(ValueCast::Coerced);
            let compiled = operator::compile_filter(filter, column, cast, param_index)?;
            param_index += compiled.params.len();
            filters.push(compiled);
        }

        let order_by = order_by(&columns, sort_column.as_ref(), request.sort.as_ref())?;
        let row_json = row_json(&columns)?;

        Ok(QueryPlan {
            database: database.to_string(),
            table,
            columns,
            row_json,
            filters,
            order_by,
            page: request.page.max(1),
            page_size: request.page_size.max(1),
        })
    }
}

/// The row as one JSON object, with exact numerics carried as their text form.
fn row_json(columns: &TableColumns) -> Result<String, QueryError> {
    let mut expr = format!("to_jsonb({})", ROW_ALIAS);
    for column in columns.columns.iter().filter(|c| renders_as_text(&c.data_type)) {
        let column = Identifier::new(&column.name, IdentifierKind::Column)?;
        expr.push_str(&format!(
            " || jsonb_build_object('{}', {}.{}::text)",
            column,
            ROW_ALIAS,
            column.quoted()
        ));
    }
    Ok(expr)
}

/// Sort column first when given, then the primary key as a tiebreak so that
/// page boundaries are deterministic.
fn order_by(
    columns: &TableColumns,
    sort_column: Option<&Identifier>,
    sort: Option<&SortSpec>,
) -> Result<Vec<String>, QueryError> {
    let mut order = Vec::new();
    if let (Some(column), Some(spec)) = (sort_column, sort) {
        order.push(format!("{} {}", column.quoted(), spec.direction.as_sql()));
    }

    if columns.primary_key.is_empty() {
        order.push(ROW_IDENTITY.to_string());
        return Ok(order);
    }
    for key in &columns.primary_key {
        if sort_column.is_some_and(|c| c.as_str() == key) {
            continue;
        }
        let key = Identifier::new(key, IdentifierKind::Column)?;
        order.push(format!("{} ASC", key.quoted()));
    }
    Ok(order)
}
