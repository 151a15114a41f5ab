//! Ingest endpoints called by game-server plugins.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use portal_core::db;
use portal_core::models::{IngestOutcome, MatchReport, Player, PlayerSeen};
use portal_core::repo::PlayerRepo;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::AppState;

/// Record a finished match.
///
/// # Endpoint
///
/// `POST /api/plugin/matches`
///
/// # Response
///
/// - `201 Created`: match stored and attributed to the live seasons it falls in
/// - `200 OK`: the match ID was already recorded, nothing changed
/// - `400 Bad Request`: malformed report
pub async fn record_match(
    State(state): State<AppState>,
    ApiJson(report): ApiJson<MatchReport>,
) -> Result<(StatusCode, Json<IngestOutcome>), ApiError> {
    let outcome = state.engine.record_match(report, Utc::now())?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

/// Record that a player joined a server.
///
/// Creates the player on first sight and keeps the stored name current.
///
/// # Endpoint
///
/// `POST /api/plugin/players`
pub async fn player_seen(
    State(state): State<AppState>,
    ApiJson(seen): ApiJson<PlayerSeen>,
) -> Result<Json<Player>, ApiError> {
    let uuid = seen.uuid.trim();
    let name = seen.name.trim();
    if uuid.is_empty() || name.is_empty() {
        return Err(ApiError::BadRequest(
            "uuid and name must not be empty".to_string(),
        ));
    }

    let conn = db::lock(&state.db)?;
    let repo = PlayerRepo::new(&conn);
    repo.upsert_seen(uuid, name, Utc::now())?;
    let player = repo
        .get(uuid)?
        .ok_or_else(|| ApiError::Internal(format!("player {uuid} vanished after upsert")))?;
    Ok(Json(player))
}
