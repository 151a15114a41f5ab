//! Request extractors whose rejections use the API error format.
//!
//! axum's own `Json` and `Query` reject with plain text and sometimes 422;
//! these wrappers turn every parse failure into a `400 {"error": ...}`.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
