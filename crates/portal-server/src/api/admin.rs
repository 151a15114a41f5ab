//! Admin endpoints for managing seasons by hand.
//!
//! Everything here goes through the season engine, so manual transitions
//! obey the same rules as the background sweep.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use portal_core::models::{NewSeason, Season, SeasonPatch};
use portal_core::SweepReport;
use serde::Serialize;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::AppState;

/// Result of a manual recalculation.
#[derive(Debug, Serialize)]
pub struct Recalculated {
    pub season_id: String,
    /// Matches counted into the rebuilt standings.
    pub matches: usize,
}

/// Create a draft season.
///
/// # Endpoint
///
/// `POST /api/admin/seasons`
pub async fn create_season(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewSeason>,
) -> Result<(StatusCode, Json<Season>), ApiError> {
    let season = state.engine.create_season(new, Utc::now())?;
    tracing::info!(season = %season.id, name = %season.name, "Season created");
    Ok((StatusCode::CREATED, Json(season)))
}

/// Edit a season.
///
/// Frozen seasons only accept cosmetic changes and recurrence.
///
/// # Endpoint
///
/// `PUT /api/admin/seasons/:id`
pub async fn update_season(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<SeasonPatch>,
) -> Result<Json<Season>, ApiError> {
    Ok(Json(state.engine.update_season(&id, patch, Utc::now())?))
}

/// Delete a draft season.
///
/// # Endpoint
///
/// `DELETE /api/admin/seasons/:id`
///
/// # Response
///
/// - `204 No Content`: deleted
/// - `409 Conflict`: the season has already gone live
pub async fn delete_season(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.engine.delete_season(&id)?;
    tracing::info!(season = %id, "Season deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/admin/seasons/:id/activate`
pub async fn activate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Season>, ApiError> {
    Ok(Json(state.engine.activate(&id, Utc::now())?))
}

/// `POST /api/admin/seasons/:id/end`
pub async fn end(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Season>, ApiError> {
    Ok(Json(state.engine.end(&id, Utc::now())?))
}

/// `POST /api/admin/seasons/:id/archive`
pub async fn archive(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Season>, ApiError> {
    Ok(Json(state.engine.archive(&id, Utc::now())?))
}

/// Rebuild a live season's standings from the recorded matches.
///
/// # Endpoint
///
/// `POST /api/admin/seasons/:id/recalculate`
pub async fn recalculate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Recalculated>, ApiError> {
    let matches = state.engine.recalculate(&id, Utc::now())?;
    Ok(Json(Recalculated {
        season_id: id,
        matches,
    }))
}

/// Create the next iteration of a finished recurring season.
///
/// Returns the existing successor when there already is one.
///
/// # Endpoint
///
/// `POST /api/admin/seasons/:id/spawn`
pub async fn spawn(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Season>, ApiError> {
    Ok(Json(state.engine.spawn_next(&id, Utc::now())?))
}

/// Run one lifecycle sweep now.
///
/// # Endpoint
///
/// `POST /api/admin/sweep`
pub async fn sweep(State(state): State<AppState>) -> Result<Json<SweepReport>, ApiError> {
    Ok(Json(state.engine.sweep(Utc::now())?))
}
