//! Request handlers.
//!
//! Every handler that touches a table runs the same preamble: the database
//! must be configured, the table name must validate, and the access gate
//! must allow the principal. Only then is a plan built.

use crate::api_types::{
    ColumnsResponse, ExportCheckRequest, ExportCheckResponse, ExportQuery, ExportRequest,
    RowsRequest,
};
use crate::error::ApiError;
use crate::principal::CurrentPrincipal;
use crate::state::AppState;
use axum::Json;
use axum::body::Body;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use vista_core::{FilterSpec, Principal, SortSpec};
use vista_policy::Decision;
use vista_query::{ChannelSink, PageResult, QueryPlan, QueryRequest, ValidatedTable};

/// Chunks buffered between the cursor task and the response body.
const EXPORT_CHANNEL_CAPACITY: usize = 16;

pub async fn healthz() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "vista-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn list_databases(
    State(state): State<AppState>,
    CurrentPrincipal(_principal): CurrentPrincipal,
) -> Json<Value> {
    Json(json!({ "databases": state.registry.database_names() }))
}

pub async fn list_tables(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(database): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.registry.ensure_known(&database)?;
    let tables = state.planner.catalog().tables(&database).await?;
    let tables = state
        .gate
        .visible_tables(&principal, &database, tables)
        .await?;
    Ok(Json(json!({ "database": database, "tables": tables })))
}

pub async fn list_columns(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path((database, table)): Path<(String, String)>,
) -> Result<Json<ColumnsResponse>, ApiError> {
    let (table, _) = authorize(&state, &principal, &database, &table).await?;
    let columns = state.planner.catalog().columns(&database, &table).await?;
    Ok(Json(ColumnsResponse {
        database,
        table: table.full_name(),
        columns: columns.columns,
        primary_key: columns.primary_key,
    }))
}

pub async fn fetch_rows(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    payload: Result<Json<RowsRequest>, JsonRejection>,
) -> Result<Json<PageResult>, ApiError> {
    let Json(req) = payload?;
    let (table, _) = authorize(&state, &principal, &req.database, &req.table).await?;

    let page_size = state.query.page_size(req.page_size);
    let plan = plan(&state, &req.database, &table, req.filters, req.sort, req.page, page_size).await?;
    let result = state.executor.execute(&plan).await?;

    tracing::info!(
        principal = %principal.id,
        database = %req.database,
        table = %table,
        total_count = result.total_count,
        page = result.page,
        "Fetched rows"
    );
    Ok(Json(result))
}

pub async fn check_export(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    payload: Result<Json<ExportCheckRequest>, JsonRejection>,
) -> Result<Json<ExportCheckResponse>, ApiError> {
    let Json(req) = payload?;
    let (table, decision) = authorize(&state, &principal, &req.database, &req.table).await?;

    let plan = plan(
        &state,
        &req.database,
        &table,
        req.filters,
        None,
        1,
        state.query.default_page_size,
    )
    .await?;
    let check = state.streamer.check_quota(&plan, &decision.quota).await?;

    Ok(Json(ExportCheckResponse::new(&decision, &check)))
}

pub async fn export_get(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    export(state, principal, ExportRequest::try_from(query)?).await
}

pub async fn export_post(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    export(state, principal, req).await
}

async fn export(state: AppState, principal: Principal, req: ExportRequest) -> Result<Response, ApiError> {
    let (table, decision) = authorize(&state, &principal, &req.database, &req.table).await?;
    let page_size = state.query.page_size(req.page_size);
    let plan = plan(&state, &req.database, &table, req.filters, req.sort, req.page, page_size).await?;
    let filename = format!("{}_export.csv", table.table);

    if !req.export_all {
        let mut out = Vec::new();
        state.streamer.export_page(&plan, &mut out).await?;
        return Ok(csv_response(&filename, Body::from(out)));
    }

    // Anything that fails up to here is still reported as JSON.
    let cursor = state.streamer.open(&plan, &decision.quota).await?;

    tracing::info!(
        principal = %principal.id,
        export_id = %cursor.export_id(),
        database = %req.database,
        table = %table,
        total_count = cursor.quota_check().total_count,
        "Starting export"
    );

    let (mut sink, mut rx) = ChannelSink::channel(EXPORT_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        if let Err(err) = cursor.pump(&mut sink).await {
            sink.fail(err.to_string()).await;
        }
    });

    let body = async_stream::stream! {
        while let Some(chunk) = rx.recv().await {
            yield chunk;
        }
    };
    Ok(csv_response(&filename, Body::from_stream(body)))
}

/// Validate the table name, check the database exists and apply the access gate.
async fn authorize(
    state: &AppState,
    principal: &Principal,
    database: &str,
    table: &str,
) -> Result<(ValidatedTable, Decision), ApiError> {
    state.registry.ensure_known(database)?;
    let table = ValidatedTable::parse(table)?;
    let decision = state
        .gate
        .authorize(principal, database, &table.full_name())
        .await?;
    Ok((table, decision))
}

async fn plan(
    state: &AppState,
    database: &str,
    table: &ValidatedTable,
    filters: Vec<FilterSpec>,
    sort: Option<SortSpec>,
    page: u32,
    page_size: u32,
) -> Result<QueryPlan, ApiError> {
    let request = QueryRequest::new(table.full_name())
        .with_filters(filters)
        .with_sort(sort)
        .with_page(page, page_size);
    Ok(state.planner.plan(database, &request).await?)
}

fn csv_response(filename: &str, body: Body) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", filename);
    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    // Validated identifiers are always legal header values.
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}
