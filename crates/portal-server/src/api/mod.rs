//! API handlers for the portal server.

pub mod admin;
pub mod matches;
pub mod players;
pub mod plugin;
pub mod seasons;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Upper bound for any `limit` query parameter.
pub const MAX_PAGE_SIZE: i64 = 200;

/// `limit` / `offset` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Maximum number of results to return.
    pub limit: Option<i64>,
    /// Number of results to skip.
    pub offset: Option<i64>,
}

impl PageQuery {
    /// Limit and offset with `default` applied and both clamped to sane values.
    pub fn resolve(&self, default: i64) -> (i64, i64) {
        let limit = self.limit.unwrap_or(default).clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

/// JSON response that browsers and proxies may cache for a minute.
pub(crate) fn cached<T: Serialize>(body: T) -> Response {
    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, "public, max-age=60")],
        Json(body),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        assert_eq!(PageQuery::default().resolve(50), (50, 0));
    }

    #[test]
    fn test_page_clamps() {
        let q = PageQuery {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(q.resolve(20), (MAX_PAGE_SIZE, 0));

        let q = PageQuery {
            limit: Some(0),
            offset: Some(3),
        };
        assert_eq!(q.resolve(20), (1, 3));
    }

    #[test]
    fn test_cached_sets_header() {
        let response = cached(vec![1, 2, 3]);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=60"
        );
    }
}
