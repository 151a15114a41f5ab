//! Bearer-token guards for the plugin and admin endpoints.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::AppState;

/// Extracts the token from an `Authorization: Bearer <token>` header.
fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Checks a presented token against the configured one.
///
/// An unset token rejects every request.
fn authorize(expected: Option<&str>, headers: &HeaderMap) -> Result<(), ApiError> {
    match (expected, bearer(headers)) {
        (Some(expected), Some(given)) if !expected.is_empty() && expected == given => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}

/// Guards `/api/plugin/*` with `auth.plugin_token`.
pub async fn require_plugin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match authorize(state.config.auth.plugin_token.as_deref(), request.headers()) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::warn!(path = %request.uri().path(), "Rejected plugin request");
            e.into_response()
        }
    }
}

/// Guards `/api/admin/*` with `auth.admin_token`.
pub async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match authorize(state.config.auth.admin_token.as_deref(), request.headers()) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request");
            e.into_response()
        }
    }
}
