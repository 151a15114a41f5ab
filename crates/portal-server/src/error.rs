//! HTTP error responses.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use portal_core::PortalError;
use serde_json::json;
use thiserror::Error;

/// Error returned by API handlers, rendered as `{"error": "..."}`.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed or invalid input.
    #[error("{0}")]
    BadRequest(String),
    /// Missing or wrong bearer token.
    #[error("unauthorized")]
    Unauthorized,
    /// The requested entity does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The request is valid but not allowed in the current state.
    #[error("{0}")]
    Conflict(String),
    /// Anything else. The detail is logged, not returned.
    #[error("internal error")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PortalError> for ApiError {
    fn from(e: PortalError) -> Self {
        match e {
            PortalError::Validation(_) => Self::BadRequest(e.to_string()),
            PortalError::NotFound(_) => Self::NotFound(e.to_string()),
            PortalError::InvalidTransition { .. } | PortalError::Conflict(_) | PortalError::Frozen(_) => {
                Self::Conflict(e.to_string())
            }
            PortalError::Database(_) | PortalError::LockPoisoned => Self::Internal(e.to_string()),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        PortalError::from(e).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            tracing::error!("Request failed: {}", detail);
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
