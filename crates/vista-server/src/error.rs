//! Error types for the HTTP layer.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use vista_policy::AccessError;
use vista_query::QueryError;

/// Errors returned by API handlers, rendered as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or unreadable principal headers.
    #[error("{0}")]
    Unauthorized(String),

    /// Malformed request body or query string.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Access(AccessError::AccessDenied { .. }) => StatusCode::FORBIDDEN,
            ApiError::Access(AccessError::GrantStore(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Query(err) => match err {
                QueryError::InvalidIdentifier { .. }
                | QueryError::InvalidColumn { .. }
                | QueryError::InvalidOperator { .. }
                | QueryError::InvalidValue(_) => StatusCode::BAD_REQUEST,
                QueryError::DatabaseNotFound(_) | QueryError::TableNotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                QueryError::ExportQuotaExceeded { .. } | QueryError::ExportTooLarge { .. } => {
                    StatusCode::PAYLOAD_TOO_LARGE
                }
                QueryError::StreamingFailure(_) | QueryError::Upstream(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
