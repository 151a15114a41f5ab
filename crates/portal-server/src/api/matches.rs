//! Match API handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use portal_core::db;
use portal_core::models::{Match, MatchDetail};
use portal_core::repo::{MatchFilter, MatchRepo};
use serde::Deserialize;

use super::PageQuery;
use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::AppState;

/// Query parameters for listing matches.
#[derive(Debug, Default, Deserialize)]
pub struct ListMatchesQuery {
    /// Only matches this player took part in.
    pub player: Option<String>,
    /// Only matches of this game mode.
    pub game_mode: Option<String>,
    /// Maximum number of results to return.
    pub limit: Option<i64>,
    /// Number of results to skip.
    pub offset: Option<i64>,
}

/// List matches with optional filtering.
///
/// # Endpoint
///
/// `GET /api/matches`
///
/// # Query Parameters
///
/// - `player`: Filter by player UUID (optional)
/// - `game_mode`: Filter by game mode (optional)
/// - `limit`: Maximum results (default: 20)
/// - `offset`: Skip results (default: 0)
///
/// # Response
///
/// - `200 OK`: JSON array of matches, most recent first
pub async fn list_matches(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListMatchesQuery>,
) -> Result<Json<Vec<Match>>, ApiError> {
    let (limit, offset) = PageQuery {
        limit: query.limit,
        offset: query.offset,
    }
    .resolve(20);
    let filter = MatchFilter {
        player: query.player.filter(|p| !p.is_empty()),
        game_mode: query.game_mode.filter(|m| !m.is_empty()),
        limit,
        offset,
    };

    let conn = db::lock(&state.db)?;
    Ok(Json(MatchRepo::new(&conn).list(&filter)?))
}

/// Get a match with its participant lines.
///
/// # Endpoint
///
/// `GET /api/matches/:id`
///
/// # Response
///
/// - `200 OK`: match with participants ordered by points
/// - `404 Not Found`: unknown match
pub async fn get_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MatchDetail>, ApiError> {
    let conn = db::lock(&state.db)?;
    let repo = MatchRepo::new(&conn);

    let match_info = repo
        .get(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("match {id} not found")))?;
    let participants = repo.participants(&id)?;

    Ok(Json(MatchDetail {
        match_info,
        participants,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use portal_core::config::PortalConfig;
    use portal_core::db::init_db;
    use portal_core::models::{MatchReport, ParticipantReport};

    fn test_state() -> AppState {
        AppState::new(init_db(":memory:").unwrap(), PortalConfig::default())
    }

    fn record(state: &AppState, id: &str, mode: &str, minute: i64, players: &[&str]) {
        let ended_at = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(minute);
        let report = MatchReport {
            id: id.to_string(),
            game_mode: mode.to_string(),
            server: None,
            started_at: ended_at - Duration::minutes(5),
            ended_at,
            winner_team: None,
            participants: players
                .iter()
                .map(|uuid| ParticipantReport {
                    uuid: uuid.to_string(),
                    name: uuid.to_uppercase(),
                    team: None,
                    kills: 1,
                    deaths: 1,
                    points: 10,
                    won: false,
                })
                .collect(),
        };
        state.engine.record_match(report, ended_at).unwrap();
    }

    #[tokio::test]
    async fn test_list_matches_empty() {
        let state = test_state();
        let Json(matches) = list_matches(State(state), ApiQuery(ListMatchesQuery::default()))
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_list_matches_filters() {
        let state = test_state();
        record(&state, "m1", "bedwars", 0, &["u-1", "u-2"]);
        record(&state, "m2", "skywars", 10, &["u-2"]);
        record(&state, "m3", "bedwars", 20, &["u-3"]);

        let Json(all) = list_matches(State(state.clone()), ApiQuery(ListMatchesQuery::default()))
            .await
            .unwrap();
        let ids: Vec<&str> = all.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m3", "m2", "m1"]);

        let query = ListMatchesQuery {
            player: Some("u-2".to_string()),
            game_mode: Some("bedwars".to_string()),
            ..Default::default()
        };
        let Json(filtered) = list_matches(State(state.clone()), ApiQuery(query)).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "m1");

        // Empty filters behave like absent ones.
        let query = ListMatchesQuery {
            player: Some(String::new()),
            limit: Some(2),
            ..Default::default()
        };
        let Json(paged) = list_matches(State(state), ApiQuery(query)).await.unwrap();
        assert_eq!(paged.len(), 2);
    }

    #[tokio::test]
    async fn test_get_match_detail() {
        let state = test_state();
        record(&state, "m1", "bedwars", 0, &["u-1", "u-2"]);

        let Json(detail) = get_match(State(state), Path("m1".to_string())).await.unwrap();
        assert_eq!(detail.match_info.id, "m1");
        assert_eq!(detail.participants.len(), 2);
    }

    #[tokio::test]
    async fn test_get_match_not_found() {
        let state = test_state();
        let result = get_match(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
