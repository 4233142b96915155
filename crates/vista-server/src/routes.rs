//! Route definitions.

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/databases", get(handlers::list_databases))
        .route("/api/databases/{database}/tables", get(handlers::list_tables))
        .route(
            "/api/databases/{database}/tables/{table}/columns",
            get(handlers::list_columns),
        )
        .route("/api/rows", post(handlers::fetch_rows))
        .route("/api/export/check", post(handlers::check_export))
        .route(
            "/api/export",
            get(handlers::export_get).post(handlers::export_post),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
