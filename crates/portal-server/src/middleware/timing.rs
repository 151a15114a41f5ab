//! Request timing middleware.
//!
//! Leaderboard reads rank every standing of a season in memory, so this is
//! where slow seasons show up first.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::{Duration, Instant};

/// Requests slower than this are logged at warn level.
pub const SLOW_REQUEST: Duration = Duration::from_millis(100);

/// Logs method, path, status and duration of every request.
pub async fn timing_layer(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    let duration_ms = elapsed.as_millis();

    if elapsed > SLOW_REQUEST {
        tracing::warn!(%method, %path, status, duration_ms, "Slow request");
    } else {
        tracing::debug!(%method, %path, status, duration_ms, "Request completed");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{self, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn fast() -> &'static str {
        "ok"
    }

    async fn slow() -> &'static str {
        tokio::time::sleep(SLOW_REQUEST + Duration::from_millis(20)).await;
        "slow"
    }

    fn app() -> Router {
        Router::new()
            .route("/fast", get(fast))
            .route("/slow", get(slow))
            .layer(middleware::from_fn(timing_layer))
    }

    #[tokio::test]
    async fn test_fast_request_passes_through() {
        let response = app()
            .oneshot(http::Request::builder().uri("/fast").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_slow_request_passes_through() {
        let response = app()
            .oneshot(http::Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_status_kept() {
        let response = app()
            .oneshot(http::Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
