//! Request principal.
//!
//! Vista runs behind an authenticating proxy that forwards the caller's
//! identity in two headers. A request without both is rejected with 401.

use crate::error::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use vista_core::{Principal, Role};

pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
pub const PRINCIPAL_ROLE_HEADER: &str = "x-principal-role";

/// The authenticated caller of the current request.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", name)))
}

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, PRINCIPAL_ID_HEADER)?;
        let role: Role = header(parts, PRINCIPAL_ROLE_HEADER)?
            .parse()
            .map_err(ApiError::Unauthorized)?;
        Ok(CurrentPrincipal(Principal::new(id, role)))
    }
}
