//! Player API handlers.

use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use portal_core::db;
use portal_core::models::{Player, PlayerProfile};
use portal_core::ranking::{RankedEntry, RankingMode};
use portal_core::repo::PlayerRepo;
use serde::{Deserialize, Serialize};

use super::{cached, PageQuery};
use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::AppState;

/// Query parameters for the all-time leaderboard.
#[derive(Debug, Default, Deserialize)]
pub struct ListPlayersQuery {
    /// Ranking mode (default: points).
    pub mode: Option<RankingMode>,
    /// Maximum number of results to return.
    pub limit: Option<i64>,
    /// Number of results to skip.
    pub offset: Option<i64>,
}

/// A page of the all-time leaderboard.
#[derive(Debug, Serialize)]
pub struct PlayerLeaderboard {
    /// Mode the entries are ranked by.
    pub mode: RankingMode,
    /// Players with at least one match.
    pub total: i64,
    /// Entries on this page.
    pub entries: Vec<RankedEntry>,
}

/// All-time leaderboard.
///
/// # Endpoint
///
/// `GET /api/players`
///
/// # Query Parameters
///
/// - `mode`: `wins`, `win_rate`, `kills`, `kd` or `points` (default)
/// - `limit`: Maximum results (default: `seasons.leaderboard_limit`)
/// - `offset`: Skip results (default: 0)
///
/// # Caching
///
/// Response is cached for 60 seconds.
pub async fn list_players(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListPlayersQuery>,
) -> Result<Response, ApiError> {
    let mode = query.mode.unwrap_or_default();
    let (limit, offset) = PageQuery {
        limit: query.limit,
        offset: query.offset,
    }
    .resolve(state.config.seasons.leaderboard_limit);

    let conn = db::lock(&state.db)?;
    let (total, entries) = PlayerRepo::new(&conn).leaderboard(mode, limit, offset)?;
    Ok(cached(PlayerLeaderboard {
        mode,
        total,
        entries,
    }))
}

/// Query parameters for player search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Name prefix.
    pub q: String,
    /// Maximum number of results (default: 10).
    pub limit: Option<i64>,
}

/// Find players by name prefix.
///
/// # Endpoint
///
/// `GET /api/players/search?q=<prefix>`
pub async fn search_players(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<Player>>, ApiError> {
    let prefix = query.q.trim();
    if prefix.is_empty() {
        return Err(ApiError::BadRequest("q is required".to_string()));
    }
    let (limit, _) = PageQuery {
        limit: query.limit,
        offset: None,
    }
    .resolve(10);

    let conn = db::lock(&state.db)?;
    Ok(Json(PlayerRepo::new(&conn).search(prefix, limit)?))
}

/// Player profile with all-time stats and season history.
///
/// # Endpoint
///
/// `GET /api/players/:uuid`
///
/// # Response
///
/// - `200 OK`: profile
/// - `404 Not Found`: unknown player
pub async fn get_player(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Response, ApiError> {
    let conn = db::lock(&state.db)?;
    let repo = PlayerRepo::new(&conn);

    let player = repo
        .get(&uuid)?
        .ok_or_else(|| ApiError::NotFound(format!("player {uuid} not found")))?;
    let seasons = repo.season_history(&uuid)?;

    Ok(cached(PlayerProfile {
        kd: player.stats.kd(),
        win_rate: player.stats.win_rate(),
        player,
        seasons,
    }))
}
