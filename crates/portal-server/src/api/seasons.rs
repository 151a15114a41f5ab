//! Public season API handlers.

use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use portal_core::models::Season;
use portal_core::ranking::RankedEntry;
use portal_core::season::SeasonStatus;
use serde::Deserialize;

use super::{cached, PageQuery};
use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::AppState;

/// Query parameters for listing seasons.
#[derive(Debug, Default, Deserialize)]
pub struct ListSeasonsQuery {
    /// Only seasons in this status.
    pub status: Option<SeasonStatus>,
}

/// List seasons, newest first.
///
/// # Endpoint
///
/// `GET /api/seasons?status=<draft|active|ended|archived>`
pub async fn list_seasons(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListSeasonsQuery>,
) -> Result<Json<Vec<Season>>, ApiError> {
    Ok(Json(state.engine.seasons(query.status)?))
}

/// Seasons that are live right now.
///
/// # Endpoint
///
/// `GET /api/seasons/current`
pub async fn current_seasons(State(state): State<AppState>) -> Result<Json<Vec<Season>>, ApiError> {
    Ok(Json(state.engine.seasons(Some(SeasonStatus::Active))?))
}

/// Get one season.
///
/// # Endpoint
///
/// `GET /api/seasons/:id`
pub async fn get_season(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Season>, ApiError> {
    Ok(Json(state.engine.season(&id)?))
}

/// Season leaderboard page.
///
/// Live for active seasons, the frozen snapshot for ended and archived ones.
///
/// # Endpoint
///
/// `GET /api/seasons/:id/leaderboard`
///
/// # Caching
///
/// Response is cached for 60 seconds.
pub async fn leaderboard(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Response, ApiError> {
    let (limit, offset) = page.resolve(state.engine.settings().leaderboard_limit);
    let board = state.engine.leaderboard(&id, limit, offset)?;
    Ok(cached(board))
}

/// A player's entry on a season leaderboard.
///
/// # Endpoint
///
/// `GET /api/seasons/:id/players/:uuid`
///
/// # Response
///
/// - `200 OK`: ranked entry
/// - `404 Not Found`: unknown season, or the player is not ranked in it
pub async fn player_standing(
    State(state): State<AppState>,
    Path((id, uuid)): Path<(String, String)>,
) -> Result<Json<RankedEntry>, ApiError> {
    state
        .engine
        .player_standing(&id, &uuid)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("player {uuid} is not ranked in season {id}")))
}
