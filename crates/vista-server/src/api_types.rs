//! Request and response bodies for the HTTP API.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use vista_core::{ColumnDescriptor, FilterSpec, SortSpec};
use vista_policy::{Decision, QuotaCheck};

/// `POST /api/rows`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsRequest {
    pub database: String,
    pub table: String,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(default)]
    pub sort: Option<SortSpec>,
}

/// `POST /api/export/check`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportCheckRequest {
    pub database: String,
    pub table: String,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportCheckResponse {
    pub total_count: u64,
    pub max_rows_for_role: u64,
    pub is_admin: bool,
    pub needs_warning: bool,
    pub exceeds_limit: bool,
    pub can_export: bool,
}

impl ExportCheckResponse {
    pub fn new(decision: &Decision, check: &QuotaCheck) -> Self {
        Self {
            total_count: check.total_count,
            max_rows_for_role: decision.quota.max_rows_for_role,
            is_admin: decision.is_admin,
            needs_warning: check.needs_warning,
            exceeds_limit: check.exceeds_limit,
            can_export: !check.exceeds_limit,
        }
    }
}

/// `POST /api/export`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub database: String,
    pub table: String,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(default)]
    pub sort: Option<SortSpec>,
    #[serde(default)]
    pub export_all: bool,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub page_size: Option<u32>,
}

/// `GET /api/export`: same fields, with `filters` and `sort` as JSON-encoded strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    pub database: String,
    pub table: String,
    #[serde(default)]
    pub filters: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub export_all: bool,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl TryFrom<ExportQuery> for ExportRequest {
    type Error = ApiError;

    fn try_from(query: ExportQuery) -> Result<Self, Self::Error> {
        let filters = decode_param(query.filters.as_deref(), "filters")?.unwrap_or_default();
        let sort = decode_param(query.sort.as_deref(), "sort")?;
        Ok(Self {
            database: query.database,
            table: query.table,
            filters,
            sort,
            export_all: query.export_all,
            page: query.page,
            page_size: query.page_size,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsResponse {
    pub database: String,
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
    pub primary_key: Vec<String>,
}

fn first_page() -> u32 {
    1
}

/// Decode a JSON-encoded query string parameter; absent or blank is `None`.
fn decode_param<T: serde::de::DeserializeOwned>(
    raw: Option<&str>,
    name: &str,
) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| ApiError::BadRequest(format!("invalid {}: {}", name, e))),
    }
}
