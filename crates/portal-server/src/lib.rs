//! Portal Server Library
//!
//! JSON API over the portal database: public leaderboards and season pages,
//! the ingest endpoints used by game-server plugins, and the admin endpoints
//! that drive the season engine by hand.

pub mod api;
pub mod error;
pub mod extract;
pub mod middleware;

use axum::routing::{get, post, put};
use axum::Router;
use portal_core::config::PortalConfig;
use portal_core::db::DbPool;
use portal_core::SeasonEngine;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: DbPool,
    /// Season engine over the same pool.
    pub engine: SeasonEngine,
    /// Loaded configuration.
    pub config: Arc<PortalConfig>,
}

impl AppState {
    /// Builds the state from an open database and the loaded configuration.
    pub fn new(db: DbPool, config: PortalConfig) -> Self {
        let engine = SeasonEngine::new(db.clone(), config.seasons.clone());
        Self {
            db,
            engine,
            config: Arc::new(config),
        }
    }
}

/// Health check endpoint.
///
/// Returns "ok" to indicate the server is running.
pub async fn health() -> &'static str {
    "ok"
}

/// Builds the full router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/health", get(health))
        .route("/api/players", get(api::players::list_players))
        .route("/api/players/search", get(api::players::search_players))
        .route("/api/players/:uuid", get(api::players::get_player))
        .route("/api/matches", get(api::matches::list_matches))
        .route("/api/matches/:id", get(api::matches::get_match))
        .route("/api/seasons", get(api::seasons::list_seasons))
        .route("/api/seasons/current", get(api::seasons::current_seasons))
        .route("/api/seasons/:id", get(api::seasons::get_season))
        .route("/api/seasons/:id/leaderboard", get(api::seasons::leaderboard))
        .route(
            "/api/seasons/:id/players/:uuid",
            get(api::seasons::player_standing),
        );

    let plugin = Router::new()
        .route("/api/plugin/matches", post(api::plugin::record_match))
        .route("/api/plugin/players", post(api::plugin::player_seen))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_plugin,
        ));

    let admin = Router::new()
        .route("/api/admin/seasons", post(api::admin::create_season))
        .route(
            "/api/admin/seasons/:id",
            put(api::admin::update_season).delete(api::admin::delete_season),
        )
        .route("/api/admin/seasons/:id/activate", post(api::admin::activate))
        .route("/api/admin/seasons/:id/end", post(api::admin::end))
        .route("/api/admin/seasons/:id/archive", post(api::admin::archive))
        .route(
            "/api/admin/seasons/:id/recalculate",
            post(api::admin::recalculate),
        )
        .route("/api/admin/seasons/:id/spawn", post(api::admin::spawn))
        .route("/api/admin/sweep", post(api::admin::sweep))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin,
        ));

    let static_dir = state.config.server.static_dir.clone();

    Router::new()
        .merge(public)
        .merge(plugin)
        .merge(admin)
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::timing_layer))
        .layer(cors)
        .fallback_service(ServeDir::new(static_dir).append_index_html_on_directories(true))
}
