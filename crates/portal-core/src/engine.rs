//! Season lifecycle and ranking engine.
//!
//! The engine is the only writer of season status, standings and frozen
//! rankings. Each public operation runs in a single `BEGIN IMMEDIATE`
//! transaction, so the server and the worker can share one database file.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::config::SeasonsConfig;
use crate::db::{self, DbPool};
use crate::error::{PortalError, PortalResult};
use crate::models::{
    IngestOutcome, Match, MatchReport, NewSeason, Season, SeasonLeaderboard, SeasonPatch,
};
use crate::ranking::{self, RankedEntry};
use crate::repo::{page, MatchRepo, PlayerRepo, RankingRepo, SeasonRepo, StandingRepo};
use crate::season::{next_iteration_name, SeasonStatus};

/// What one lifecycle sweep changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    /// Seasons that were ended and frozen.
    pub ended: Vec<String>,
    /// Successor seasons that were created.
    pub spawned: Vec<String>,
    /// Drafts that went live.
    pub activated: Vec<String>,
    /// Ended seasons that were archived.
    pub archived: Vec<String>,
    /// Seasons whose step failed; see the log for details.
    pub failed: Vec<String>,
}

impl SweepReport {
    /// True if the sweep changed nothing.
    pub fn is_empty(&self) -> bool {
        self.ended.is_empty()
            && self.spawned.is_empty()
            && self.activated.is_empty()
            && self.archived.is_empty()
            && self.failed.is_empty()
    }
}

/// Drives seasons through their lifecycle and keeps standings current.
#[derive(Clone)]
pub struct SeasonEngine {
    db: DbPool,
    settings: SeasonsConfig,
}

impl SeasonEngine {
    /// Creates an engine over a shared connection.
    pub fn new(db: DbPool, settings: SeasonsConfig) -> Self {
        Self { db, settings }
    }

    /// The shared connection.
    pub fn db(&self) -> &DbPool {
        &self.db
    }

    /// Season settings the engine was built with.
    pub fn settings(&self) -> &SeasonsConfig {
        &self.settings
    }

    fn read<T>(&self, f: impl FnOnce(&Connection) -> PortalResult<T>) -> PortalResult<T> {
        let conn = db::lock(&self.db)?;
        f(&conn)
    }

    fn write<T>(&self, f: impl FnOnce(&Connection) -> PortalResult<T>) -> PortalResult<T> {
        let conn = db::lock(&self.db)?;
        conn.execute_batch("BEGIN IMMEDIATE;")?;

        let result = f(&conn).and_then(|value| {
            conn.execute_batch("COMMIT;")?;
            Ok(value)
        });
        if result.is_err() && !conn.is_autocommit() {
            let _ = conn.execute_batch("ROLLBACK;");
        }
        result
    }

    /// Loads a season.
    pub fn season(&self, id: &str) -> PortalResult<Season> {
        self.read(|conn| load(conn, id))
    }

    /// Lists seasons, optionally by status.
    pub fn seasons(&self, status: Option<SeasonStatus>) -> PortalResult<Vec<Season>> {
        self.read(|conn| Ok(SeasonRepo::new(conn).list(status)?))
    }

    /// Creates a draft season.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Validation`] for an empty name, an empty or
    /// inverted window, or a negative qualification threshold.
    pub fn create_season(&self, new: NewSeason, now: DateTime<Utc>) -> PortalResult<Season> {
        let season = Season {
            id: uuid::Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            description: non_empty(new.description),
            status: SeasonStatus::Draft,
            ranking_mode: new.ranking_mode,
            game_mode: non_empty(new.game_mode),
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            min_matches: new.min_matches.unwrap_or(self.settings.default_min_matches),
            recurrence: new.recurrence,
            iteration: 1,
            parent_id: None,
            created_at: now,
            ended_at: None,
            frozen_at: None,
            archived_at: None,
        };
        validate(&season)?;

        self.write(|conn| {
            SeasonRepo::new(conn).insert(&season)?;
            Ok(())
        })?;
        tracing::info!(season = %season.id, "Created season '{}'", season.name);
        Ok(season)
    }

    /// Applies a partial update.
    ///
    /// Drafts and active seasons accept every field. Changing the window or
    /// game-mode filter of an active season rebuilds its standings. Ended and
    /// archived seasons only accept name, description and recurrence.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Frozen`] when a frozen season's ranking inputs
    /// would change, [`PortalError::Validation`] for invalid values.
    pub fn update_season(
        &self,
        id: &str,
        patch: SeasonPatch,
        now: DateTime<Utc>,
    ) -> PortalResult<Season> {
        self.write(|conn| {
            let mut season = load(conn, id)?;
            if season.status.is_frozen() && patch.touches_ranking() {
                return Err(PortalError::Frozen(season.id));
            }
            let rebuild = season.status == SeasonStatus::Active && patch.touches_attribution();

            if let Some(name) = patch.name {
                season.name = name.trim().to_string();
            }
            if let Some(description) = patch.description {
                season.description = non_empty(Some(description));
            }
            if let Some(mode) = patch.ranking_mode {
                season.ranking_mode = mode;
            }
            if let Some(game_mode) = patch.game_mode {
                season.game_mode = non_empty(Some(game_mode));
            }
            if let Some(starts_at) = patch.starts_at {
                season.starts_at = starts_at;
            }
            if let Some(ends_at) = patch.ends_at {
                season.ends_at = ends_at;
            }
            if let Some(min_matches) = patch.min_matches {
                season.min_matches = min_matches;
            }
            if let Some(recurrence) = patch.recurrence {
                season.recurrence = recurrence;
            }
            validate(&season)?;

            SeasonRepo::new(conn).update(&season)?;
            if rebuild {
                let replayed = rebuild_standings(conn, &season, now)?;
                tracing::info!(season = %season.id, replayed, "Window changed, standings rebuilt");
            }
            Ok(season)
        })
    }

    /// Deletes a draft season.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Conflict`] for seasons that have gone live.
    pub fn delete_season(&self, id: &str) -> PortalResult<()> {
        self.write(|conn| {
            let season = load(conn, id)?;
            if season.status != SeasonStatus::Draft {
                return Err(PortalError::Conflict(format!(
                    "season {} is {} and cannot be deleted",
                    season.id, season.status
                )));
            }
            SeasonRepo::new(conn).delete(&season.id)?;
            Ok(())
        })?;
        tracing::info!(season = %id, "Deleted draft season");
        Ok(())
    }

    /// Takes a draft live and counts matches already recorded in its window.
    ///
    /// A start in the future is pulled back to `now`.
    pub fn activate(&self, id: &str, now: DateTime<Utc>) -> PortalResult<Season> {
        let (season, backfilled) = self.write(|conn| activate_in(conn, id, now))?;
        tracing::info!(
            season = %season.id,
            backfilled,
            "Season '{}' is now active",
            season.name
        );
        Ok(season)
    }

    /// Ends an active season and freezes its ranking.
    ///
    /// An end in the future is pulled forward to `now`. Ending a season that
    /// is already frozen returns it unchanged.
    pub fn end(&self, id: &str, now: DateTime<Utc>) -> PortalResult<Season> {
        let (season, ranked) = self.write(|conn| end_in(conn, id, now))?;
        if let Some(ranked) = ranked {
            tracing::info!(season = %season.id, ranked, "Season '{}' ended", season.name);
        }
        Ok(season)
    }

    /// Archives an ended season.
    pub fn archive(&self, id: &str, now: DateTime<Utc>) -> PortalResult<Season> {
        let season = self.write(|conn| archive_in(conn, id, now))?;
        tracing::info!(season = %season.id, "Season '{}' archived", season.name);
        Ok(season)
    }

    /// Counts a recorded match toward every active season that covers it.
    ///
    /// Returns the seasons the match was newly counted for.
    pub fn attribute_match(&self, match_id: &str, now: DateTime<Utc>) -> PortalResult<Vec<String>> {
        self.write(|conn| {
            let m = MatchRepo::new(conn)
                .get(match_id)?
                .ok_or_else(|| PortalError::NotFound(format!("match {match_id}")))?;
            attribute(conn, &m, now)
        })
    }

    /// Stores a plugin match report and updates every affected counter.
    ///
    /// Reports are idempotent on the match ID: a repeat changes nothing and
    /// comes back with `created = false`.
    pub fn record_match(
        &self,
        report: MatchReport,
        now: DateTime<Utc>,
    ) -> PortalResult<IngestOutcome> {
        report.validate()?;

        let outcome = self.write(|conn| {
            let matches = MatchRepo::new(conn);
            if matches.get(&report.id)?.is_some() {
                return Ok(IngestOutcome {
                    match_id: report.id.clone(),
                    created: false,
                    seasons: Vec::new(),
                });
            }

            let players = PlayerRepo::new(conn);
            for p in &report.participants {
                players.upsert_seen(&p.uuid, &p.name, report.ended_at)?;
                players.add_totals(&p.uuid, &p.stat_line())?;
            }
            matches.insert(&report, now)?;

            let stored = matches
                .get(&report.id)?
                .ok_or_else(|| PortalError::NotFound(format!("match {}", report.id)))?;
            let seasons = attribute(conn, &stored, now)?;
            Ok(IngestOutcome {
                match_id: report.id.clone(),
                created: true,
                seasons,
            })
        })?;

        if outcome.created {
            tracing::debug!(
                match_id = %outcome.match_id,
                seasons = outcome.seasons.len(),
                "Recorded match"
            );
        } else {
            tracing::debug!(match_id = %outcome.match_id, "Duplicate match report ignored");
        }
        Ok(outcome)
    }

    /// Rebuilds a season's standings from the recorded matches.
    ///
    /// Drafts are only cleared. Returns the number of matches counted.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Frozen`] for ended and archived seasons.
    pub fn recalculate(&self, id: &str, now: DateTime<Utc>) -> PortalResult<usize> {
        let replayed = self.write(|conn| {
            let season = load(conn, id)?;
            match season.status {
                SeasonStatus::Draft => {
                    StandingRepo::new(conn).clear(&season.id)?;
                    Ok(0)
                }
                SeasonStatus::Active => rebuild_standings(conn, &season, now),
                SeasonStatus::Ended | SeasonStatus::Archived => Err(PortalError::Frozen(season.id)),
            }
        })?;
        tracing::info!(season = %id, replayed, "Recalculated standings");
        Ok(replayed)
    }

    /// A page of a season's leaderboard.
    ///
    /// Active seasons are ranked live from standings, frozen seasons read
    /// their snapshot and drafts have no entries.
    pub fn leaderboard(&self, id: &str, limit: i64, offset: i64) -> PortalResult<SeasonLeaderboard> {
        self.read(|conn| {
            let season = load(conn, id)?;
            let (frozen, total, entries) = match season.status {
                SeasonStatus::Draft => (false, 0, Vec::new()),
                SeasonStatus::Active => {
                    let ranked = live_ranking(conn, &season)?;
                    (false, ranked.len() as i64, page(ranked, limit, offset))
                }
                SeasonStatus::Ended | SeasonStatus::Archived => {
                    let rankings = RankingRepo::new(conn);
                    let total = rankings.frozen_count(&season.id)?;
                    (true, total, rankings.frozen(&season.id, limit, offset)?)
                }
            };
            Ok(SeasonLeaderboard {
                season,
                frozen,
                total,
                entries,
            })
        })
    }

    /// A player's entry on a season's leaderboard, `None` if unranked.
    pub fn player_standing(&self, id: &str, player_uuid: &str) -> PortalResult<Option<RankedEntry>> {
        self.read(|conn| {
            let season = load(conn, id)?;
            match season.status {
                SeasonStatus::Draft => Ok(None),
                SeasonStatus::Active => Ok(live_ranking(conn, &season)?
                    .into_iter()
                    .find(|e| e.player_uuid == player_uuid)),
                SeasonStatus::Ended | SeasonStatus::Archived => {
                    Ok(RankingRepo::new(conn).frozen_for(&season.id, player_uuid)?)
                }
            }
        })
    }

    /// Creates the next iteration of an ended recurring season.
    ///
    /// Returns the existing successor if there already is one.
    pub fn spawn_next(&self, id: &str, now: DateTime<Utc>) -> PortalResult<Season> {
        let (child, created) = self.write(|conn| spawn_in(conn, id, now))?;
        if created {
            tracing::info!(
                season = %child.id,
                parent = %id,
                "Spawned '{}' ({} to {})",
                child.name,
                child.starts_at,
                child.ends_at
            );
        }
        Ok(child)
    }

    /// Runs one lifecycle pass.
    ///
    /// Steps run in order: end overdue seasons, spawn successors, activate
    /// due drafts, archive old ended seasons. Each season is handled in its
    /// own transaction; a failure is logged and recorded in the report and
    /// the sweep moves on.
    pub fn sweep(&self, now: DateTime<Utc>) -> PortalResult<SweepReport> {
        let mut report = SweepReport::default();

        let due = self.read(|conn| Ok(SeasonRepo::new(conn).due_for_ending(now)?))?;
        for season in due {
            match self.end(&season.id, now) {
                Ok(_) => report.ended.push(season.id),
                Err(e) => {
                    tracing::error!(season = %season.id, "Failed to end season: {}", e);
                    report.failed.push(season.id);
                }
            }
        }

        let parents = self.read(|conn| Ok(SeasonRepo::new(conn).ended_without_successor()?))?;
        for parent in parents {
            match self.spawn_next(&parent.id, now) {
                Ok(child) => report.spawned.push(child.id),
                Err(e) => {
                    tracing::error!(season = %parent.id, "Failed to spawn successor: {}", e);
                    report.failed.push(parent.id);
                }
            }
        }

        let drafts = self.read(|conn| Ok(SeasonRepo::new(conn).due_for_activation(now)?))?;
        for season in drafts {
            match self.activate(&season.id, now) {
                Ok(_) => report.activated.push(season.id),
                Err(e) => {
                    tracing::error!(season = %season.id, "Failed to activate season: {}", e);
                    report.failed.push(season.id);
                }
            }
        }

        if let Some(age) = self.settings.archive_after() {
            let cutoff = now - age;
            let old = self.read(|conn| Ok(SeasonRepo::new(conn).due_for_archive(cutoff)?))?;
            for season in old {
                match self.archive(&season.id, now) {
                    Ok(_) => report.archived.push(season.id),
                    Err(e) => {
                        tracing::error!(season = %season.id, "Failed to archive season: {}", e);
                        report.failed.push(season.id);
                    }
                }
            }
        }

        Ok(report)
    }
}

fn load(conn: &Connection, id: &str) -> PortalResult<Season> {
    SeasonRepo::new(conn)
        .get(id)?
        .ok_or_else(|| PortalError::NotFound(format!("season {id}")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate(season: &Season) -> PortalResult<()> {
    if season.name.is_empty() {
        return Err(PortalError::validation("season name is required"));
    }
    if season.starts_at >= season.ends_at {
        return Err(PortalError::validation("starts_at must be before ends_at"));
    }
    if season.min_matches < 0 {
        return Err(PortalError::validation("min_matches cannot be negative"));
    }
    Ok(())
}

fn transition(conn: &Connection, season: &mut Season, to: SeasonStatus) -> PortalResult<()> {
    let from = season.status;
    from.transition(to)?;
    if !SeasonRepo::new(conn).set_status(&season.id, from, to)? {
        return Err(PortalError::InvalidTransition { from, to });
    }
    season.status = to;
    Ok(())
}

/// Counts `m` toward one season unless it already was.
fn count_match(conn: &Connection, season: &Season, m: &Match, now: DateTime<Utc>) -> PortalResult<bool> {
    let standings = StandingRepo::new(conn);
    if !standings.mark_attributed(&season.id, &m.id, now)? {
        return Ok(false);
    }
    for p in MatchRepo::new(conn).participants(&m.id)? {
        standings.apply(&season.id, &p.player_uuid, &p.stat_line(), m.ended_at)?;
    }
    Ok(true)
}

fn attribute(conn: &Connection, m: &Match, now: DateTime<Utc>) -> PortalResult<Vec<String>> {
    let mut counted = Vec::new();
    for season in SeasonRepo::new(conn).active_at(m.ended_at)? {
        if season.covers(&m.game_mode, m.ended_at) && count_match(conn, &season, m, now)? {
            counted.push(season.id);
        }
    }
    Ok(counted)
}

fn replay_window(conn: &Connection, season: &Season, now: DateTime<Utc>) -> PortalResult<usize> {
    let matches = MatchRepo::new(conn);
    let ids = matches.in_window(season.starts_at, season.ends_at, season.game_mode.as_deref())?;
    let mut counted = 0;
    for id in ids {
        if let Some(m) = matches.get(&id)? {
            if count_match(conn, season, &m, now)? {
                counted += 1;
            }
        }
    }
    Ok(counted)
}

fn rebuild_standings(conn: &Connection, season: &Season, now: DateTime<Utc>) -> PortalResult<usize> {
    StandingRepo::new(conn).clear(&season.id)?;
    replay_window(conn, season, now)
}

fn live_ranking(conn: &Connection, season: &Season) -> PortalResult<Vec<RankedEntry>> {
    let contenders = StandingRepo::new(conn).list(&season.id)?;
    Ok(ranking::rank(season.ranking_mode, contenders, season.min_matches))
}

fn activate_in(conn: &Connection, id: &str, now: DateTime<Utc>) -> PortalResult<(Season, usize)> {
    let mut season = load(conn, id)?;
    season.status.transition(SeasonStatus::Active)?;
    if season.ends_at <= now {
        return Err(PortalError::validation(
            "season window is already over and cannot be activated",
        ));
    }
    if season.starts_at > now {
        season.starts_at = now;
    }

    SeasonRepo::new(conn).update(&season)?;
    transition(conn, &mut season, SeasonStatus::Active)?;
    let backfilled = replay_window(conn, &season, now)?;
    Ok((season, backfilled))
}

fn end_in(conn: &Connection, id: &str, now: DateTime<Utc>) -> PortalResult<(Season, Option<usize>)> {
    let mut season = load(conn, id)?;
    if season.status.is_frozen() {
        return Ok((season, None));
    }
    season.status.transition(SeasonStatus::Ended)?;

    if season.ends_at > now {
        season.ends_at = now.max(season.starts_at);
    }

    let ranked = live_ranking(conn, &season)?;
    let rankings = RankingRepo::new(conn);
    if !rankings.has_frozen(&season.id)? {
        rankings.write_frozen(&season.id, &ranked)?;
    }

    season.ended_at = Some(now);
    season.frozen_at = Some(now);
    SeasonRepo::new(conn).update(&season)?;
    transition(conn, &mut season, SeasonStatus::Ended)?;
    Ok((season, Some(ranked.len())))
}

fn archive_in(conn: &Connection, id: &str, now: DateTime<Utc>) -> PortalResult<Season> {
    let mut season = load(conn, id)?;
    season.status.transition(SeasonStatus::Archived)?;
    season.archived_at = Some(now);
    SeasonRepo::new(conn).update(&season)?;
    transition(conn, &mut season, SeasonStatus::Archived)?;
    Ok(season)
}

fn spawn_in(conn: &Connection, id: &str, now: DateTime<Utc>) -> PortalResult<(Season, bool)> {
    let parent = load(conn, id)?;
    if !parent.status.is_frozen() {
        return Err(PortalError::Conflict(format!(
            "season {} has not ended yet",
            parent.id
        )));
    }
    if !parent.recurrence.is_recurring() {
        return Err(PortalError::validation(format!(
            "season {} does not recur",
            parent.id
        )));
    }

    let seasons = SeasonRepo::new(conn);
    if let Some(existing) = seasons.child_of(&parent.id)? {
        return Ok((existing, false));
    }

    let (starts_at, ends_at) = parent
        .recurrence
        .next_window(parent.ends_at, now)
        .ok_or_else(|| PortalError::validation("next season window is out of range"))?;
    let iteration = parent.iteration + 1;

    let child = Season {
        id: uuid::Uuid::new_v4().to_string(),
        name: next_iteration_name(&parent.name, iteration),
        description: parent.description.clone(),
        status: SeasonStatus::Draft,
        ranking_mode: parent.ranking_mode,
        game_mode: parent.game_mode.clone(),
        starts_at,
        ends_at,
        min_matches: parent.min_matches,
        recurrence: parent.recurrence,
        iteration,
        parent_id: Some(parent.id.clone()),
        created_at: now,
        ended_at: None,
        frozen_at: None,
        archived_at: None,
    };
    seasons.insert(&child)?;
    Ok((child, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::ParticipantReport;
    use crate::ranking::RankingMode;
    use crate::season::Recurrence;
    use chrono::{Duration, TimeZone};

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, d, h, 0, 0).unwrap()
    }

    fn engine() -> SeasonEngine {
        SeasonEngine::new(init_db(":memory:").unwrap(), SeasonsConfig::default())
    }

    fn new_season(start: DateTime<Utc>, end: DateTime<Utc>) -> NewSeason {
        NewSeason {
            name: "Spring".to_string(),
            description: None,
            ranking_mode: RankingMode::Points,
            game_mode: None,
            starts_at: start,
            ends_at: end,
            min_matches: None,
            recurrence: Recurrence::None,
        }
    }

    fn player(uuid: &str, kills: i64, deaths: i64, points: i64, won: bool) -> ParticipantReport {
        ParticipantReport {
            uuid: uuid.to_string(),
            name: uuid.to_uppercase(),
            team: None,
            kills,
            deaths,
            points,
            won,
        }
    }

    fn report(id: &str, mode: &str, ended: DateTime<Utc>) -> MatchReport {
        MatchReport {
            id: id.to_string(),
            game_mode: mode.to_string(),
            server: None,
            started_at: ended - Duration::minutes(10),
            ended_at: ended,
            winner_team: None,
            participants: vec![player("alex", 5, 1, 100, true), player("steve", 1, 5, 20, false)],
        }
    }

    /// Helper to create and activate a season covering May 1 to May 31.
    fn active_season(engine: &SeasonEngine) -> Season {
        let s = engine
            .create_season(new_season(at(1, 0), at(31, 0)), at(1, 0))
            .unwrap();
        engine.activate(&s.id, at(1, 0)).unwrap()
    }

    #[test]
    fn test_create_season_is_draft() {
        let engine = engine();
        let s = engine
            .create_season(new_season(at(1, 0), at(8, 0)), at(1, 0))
            .unwrap();
        assert_eq!(s.status, SeasonStatus::Draft);
        assert_eq!(s.iteration, 1);
        assert_eq!(engine.season(&s.id).unwrap(), s);
    }

    #[test]
    fn test_create_season_validation() {
        let engine = engine();

        let inverted = new_season(at(8, 0), at(1, 0));
        assert!(matches!(
            engine.create_season(inverted, at(1, 0)),
            Err(PortalError::Validation(_))
        ));

        let mut unnamed = new_season(at(1, 0), at(8, 0));
        unnamed.name = "   ".to_string();
        assert!(engine.create_season(unnamed, at(1, 0)).is_err());

        let mut negative = new_season(at(1, 0), at(8, 0));
        negative.min_matches = Some(-1);
        assert!(engine.create_season(negative, at(1, 0)).is_err());
    }

    #[test]
    fn test_create_season_uses_default_min_matches() {
        let settings = SeasonsConfig {
            default_min_matches: 3,
            ..Default::default()
        };
        let engine = SeasonEngine::new(init_db(":memory:").unwrap(), settings);

        let s = engine
            .create_season(new_season(at(1, 0), at(8, 0)), at(1, 0))
            .unwrap();
        assert_eq!(s.min_matches, 3);
    }

    #[test]
    fn test_activate_pulls_start_back_and_backfills() {
        let engine = engine();
        engine.record_match(report("early", "bedwars", at(2, 12)), at(2, 12)).unwrap();

        let s = engine
            .create_season(new_season(at(1, 0), at(10, 0)), at(1, 0))
            .unwrap();
        let active = engine.activate(&s.id, at(3, 0)).unwrap();
        assert_eq!(active.status, SeasonStatus::Active);
        assert_eq!(active.starts_at, at(1, 0));

        let board = engine.leaderboard(&s.id, 10, 0).unwrap();
        assert_eq!(board.total, 2);
        assert_eq!(board.entries[0].player_uuid, "alex");

        let future = engine
            .create_season(new_season(at(20, 0), at(30, 0)), at(1, 0))
            .unwrap();
        let pulled = engine.activate(&future.id, at(5, 0)).unwrap();
        assert_eq!(pulled.starts_at, at(5, 0));
    }

    #[test]
    fn test_activate_rejects_elapsed_window_and_non_drafts() {
        let engine = engine();
        let s = engine
            .create_season(new_season(at(1, 0), at(2, 0)), at(1, 0))
            .unwrap();
        assert!(matches!(
            engine.activate(&s.id, at(2, 0)),
            Err(PortalError::Validation(_))
        ));

        let live = active_season(&engine);
        assert!(matches!(
            engine.activate(&live.id, at(2, 0)),
            Err(PortalError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_record_match_attributes_to_covering_seasons() {
        let engine = engine();
        let all = active_season(&engine);

        let mut bw = new_season(at(1, 0), at(31, 0));
        bw.game_mode = Some("bedwars".to_string());
        let bedwars = engine.create_season(bw, at(1, 0)).unwrap();
        engine.activate(&bedwars.id, at(1, 0)).unwrap();

        let outcome = engine
            .record_match(report("m1", "skywars", at(2, 12)), at(2, 12))
            .unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.seasons, vec![all.id.clone()]);

        let outcome = engine
            .record_match(report("m2", "bedwars", at(2, 13)), at(2, 13))
            .unwrap();
        assert_eq!(outcome.seasons.len(), 2);
    }

    #[test]
    fn test_record_match_is_idempotent() {
        let engine = engine();
        let s = active_season(&engine);

        let first = engine.record_match(report("m1", "bedwars", at(2, 12)), at(2, 12)).unwrap();
        let second = engine.record_match(report("m1", "bedwars", at(2, 12)), at(2, 13)).unwrap();
        assert!(first.created);
        assert!(!second.created);
        assert!(second.seasons.is_empty());

        let entry = engine.player_standing(&s.id, "alex").unwrap().unwrap();
        assert_eq!(entry.stats.matches, 1);
        assert_eq!(entry.stats.points, 100);

        let conn = engine.db().lock().unwrap();
        let alex = PlayerRepo::new(&conn).get("alex").unwrap().unwrap();
        assert_eq!(alex.stats.matches, 1);
    }

    #[test]
    fn test_record_match_rejects_invalid_report() {
        let engine = engine();
        let mut bad = report("m1", "bedwars", at(2, 12));
        bad.participants.clear();
        assert!(matches!(
            engine.record_match(bad, at(2, 12)),
            Err(PortalError::Validation(_))
        ));

        let conn = engine.db().lock().unwrap();
        assert!(MatchRepo::new(&conn).get("m1").unwrap().is_none());
    }

    #[test]
    fn test_match_outside_window_not_counted() {
        let engine = engine();
        let s = active_season(&engine);

        let outcome = engine
            .record_match(report("late", "bedwars", at(31, 0)), at(31, 0))
            .unwrap();
        assert!(outcome.seasons.is_empty());
        assert_eq!(engine.leaderboard(&s.id, 10, 0).unwrap().total, 0);
    }

    #[test]
    fn test_attribute_match_twice_counts_once() {
        let engine = engine();
        let s = active_season(&engine);
        engine.record_match(report("m1", "bedwars", at(2, 12)), at(2, 12)).unwrap();

        assert!(engine.attribute_match("m1", at(3, 0)).unwrap().is_empty());
        let entry = engine.player_standing(&s.id, "steve").unwrap().unwrap();
        assert_eq!(entry.stats.matches, 1);

        assert!(matches!(
            engine.attribute_match("nope", at(3, 0)),
            Err(PortalError::NotFound(_))
        ));
    }

    #[test]
    fn test_end_freezes_ranking() {
        let engine = engine();
        let s = active_season(&engine);
        engine.record_match(report("m1", "bedwars", at(2, 12)), at(2, 12)).unwrap();

        let ended = engine.end(&s.id, at(10, 0)).unwrap();
        assert_eq!(ended.status, SeasonStatus::Ended);
        assert_eq!(ended.ends_at, at(10, 0));
        assert_eq!(ended.ended_at, Some(at(10, 0)));
        assert_eq!(ended.frozen_at, Some(at(10, 0)));

        let board = engine.leaderboard(&s.id, 10, 0).unwrap();
        assert!(board.frozen);
        assert_eq!(board.total, 2);
        assert_eq!(board.entries[0].rank, 1);
        assert_eq!(board.entries[0].player_uuid, "alex");
    }

    #[test]
    fn test_frozen_ranking_ignores_later_changes() {
        let engine = engine();
        let s = active_season(&engine);
        engine.record_match(report("m1", "bedwars", at(2, 12)), at(2, 12)).unwrap();
        engine.end(&s.id, at(10, 0)).unwrap();

        let before = engine.leaderboard(&s.id, 10, 0).unwrap();

        // Late report for a match inside the old window.
        let mut late = report("m2", "bedwars", at(9, 0));
        late.participants = vec![player("steve", 50, 0, 1000, true)];
        engine.record_match(late, at(11, 0)).unwrap();

        let after = engine.leaderboard(&s.id, 10, 0).unwrap();
        assert_eq!(before.entries, after.entries);

        assert!(matches!(
            engine.recalculate(&s.id, at(11, 0)),
            Err(PortalError::Frozen(_))
        ));
    }

    #[test]
    fn test_end_twice_is_noop() {
        let engine = engine();
        let s = active_season(&engine);
        let first = engine.end(&s.id, at(10, 0)).unwrap();
        let second = engine.end(&s.id, at(12, 0)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_end_rejects_draft() {
        let engine = engine();
        let s = engine
            .create_season(new_season(at(1, 0), at(8, 0)), at(1, 0))
            .unwrap();
        assert!(matches!(
            engine.end(&s.id, at(2, 0)),
            Err(PortalError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_min_matches_filters_frozen_ranking() {
        let engine = engine();
        let mut new = new_season(at(1, 0), at(31, 0));
        new.min_matches = Some(2);
        let s = engine.create_season(new, at(1, 0)).unwrap();
        engine.activate(&s.id, at(1, 0)).unwrap();

        engine.record_match(report("m1", "bedwars", at(2, 12)), at(2, 12)).unwrap();
        let mut solo = report("m2", "bedwars", at(3, 12));
        solo.participants = vec![player("alex", 1, 1, 10, true)];
        engine.record_match(solo, at(3, 12)).unwrap();

        engine.end(&s.id, at(10, 0)).unwrap();
        let board = engine.leaderboard(&s.id, 10, 0).unwrap();
        assert_eq!(board.total, 1);
        assert_eq!(board.entries[0].player_uuid, "alex");
        assert!(engine.player_standing(&s.id, "steve").unwrap().is_none());
    }

    #[test]
    fn test_archive_requires_ended() {
        let engine = engine();
        let s = active_season(&engine);
        assert!(engine.archive(&s.id, at(2, 0)).is_err());

        engine.end(&s.id, at(10, 0)).unwrap();
        let archived = engine.archive(&s.id, at(12, 0)).unwrap();
        assert_eq!(archived.status, SeasonStatus::Archived);
        assert_eq!(archived.archived_at, Some(at(12, 0)));
        assert!(engine.leaderboard(&s.id, 10, 0).unwrap().frozen);
    }

    #[test]
    fn test_update_active_window_rebuilds_standings() {
        let engine = engine();
        let s = active_season(&engine);
        engine.record_match(report("m1", "bedwars", at(2, 12)), at(2, 12)).unwrap();
        engine.record_match(report("m2", "bedwars", at(5, 12)), at(5, 12)).unwrap();

        let patch = SeasonPatch {
            starts_at: Some(at(4, 0)),
            ..Default::default()
        };
        engine.update_season(&s.id, patch, at(6, 0)).unwrap();

        let entry = engine.player_standing(&s.id, "alex").unwrap().unwrap();
        assert_eq!(entry.stats.matches, 1);
    }

    #[test]
    fn test_update_frozen_season() {
        let engine = engine();
        let s = active_season(&engine);
        engine.end(&s.id, at(10, 0)).unwrap();

        let rename = SeasonPatch {
            name: Some("Spring Cup".to_string()),
            description: Some("Final standings".to_string()),
            ..Default::default()
        };
        let renamed = engine.update_season(&s.id, rename, at(11, 0)).unwrap();
        assert_eq!(renamed.name, "Spring Cup");
        assert_eq!(renamed.description.as_deref(), Some("Final standings"));

        let mode = SeasonPatch {
            ranking_mode: Some(RankingMode::Kills),
            ..Default::default()
        };
        assert!(matches!(
            engine.update_season(&s.id, mode, at(11, 0)),
            Err(PortalError::Frozen(_))
        ));
    }

    #[test]
    fn test_update_clears_optional_fields_with_empty_string() {
        let engine = engine();
        let mut new = new_season(at(1, 0), at(8, 0));
        new.game_mode = Some("bedwars".to_string());
        let s = engine.create_season(new, at(1, 0)).unwrap();

        let patch = SeasonPatch {
            game_mode: Some(String::new()),
            ..Default::default()
        };
        let updated = engine.update_season(&s.id, patch, at(1, 0)).unwrap();
        assert!(updated.game_mode.is_none());
    }

    #[test]
    fn test_delete_only_drafts() {
        let engine = engine();
        let draft = engine
            .create_season(new_season(at(1, 0), at(8, 0)), at(1, 0))
            .unwrap();
        engine.delete_season(&draft.id).unwrap();
        assert!(matches!(engine.season(&draft.id), Err(PortalError::NotFound(_))));

        let live = active_season(&engine);
        assert!(matches!(
            engine.delete_season(&live.id),
            Err(PortalError::Conflict(_))
        ));
    }

    #[test]
    fn test_recalculate_active_matches_incremental() {
        let engine = engine();
        let s = active_season(&engine);
        engine.record_match(report("m1", "bedwars", at(2, 12)), at(2, 12)).unwrap();
        engine.record_match(report("m2", "skywars", at(3, 12)), at(3, 12)).unwrap();

        let before = engine.leaderboard(&s.id, 10, 0).unwrap();
        assert_eq!(engine.recalculate(&s.id, at(4, 0)).unwrap(), 2);
        let after = engine.leaderboard(&s.id, 10, 0).unwrap();
        assert_eq!(before.entries, after.entries);
    }

    #[test]
    fn test_draft_leaderboard_empty() {
        let engine = engine();
        let s = engine
            .create_season(new_season(at(1, 0), at(8, 0)), at(1, 0))
            .unwrap();
        let board = engine.leaderboard(&s.id, 10, 0).unwrap();
        assert!(!board.frozen);
        assert_eq!(board.total, 0);
        assert!(board.entries.is_empty());
        assert!(engine.player_standing(&s.id, "alex").unwrap().is_none());
    }

    #[test]
    fn test_spawn_next_creates_single_successor() {
        let engine = engine();
        let mut new = new_season(at(1, 0), at(8, 0));
        new.recurrence = Recurrence::Weekly;
        new.name = "Weekly Cup".to_string();
        let s = engine.create_season(new, at(1, 0)).unwrap();
        engine.activate(&s.id, at(1, 0)).unwrap();
        engine.end(&s.id, at(8, 0)).unwrap();

        let child = engine.spawn_next(&s.id, at(8, 0)).unwrap();
        assert_eq!(child.name, "Weekly Cup #2");
        assert_eq!(child.iteration, 2);
        assert_eq!(child.status, SeasonStatus::Draft);
        assert_eq!(child.parent_id.as_deref(), Some(s.id.as_str()));
        assert_eq!(child.starts_at, at(8, 0));
        assert_eq!(child.ends_at, at(15, 0));
        assert_eq!(child.recurrence, Recurrence::Weekly);

        let again = engine.spawn_next(&s.id, at(9, 0)).unwrap();
        assert_eq!(again.id, child.id);
    }

    #[test]
    fn test_spawn_next_rejects_running_or_one_off() {
        let engine = engine();
        let one_off = active_season(&engine);
        assert!(matches!(
            engine.spawn_next(&one_off.id, at(2, 0)),
            Err(PortalError::Conflict(_))
        ));
        engine.end(&one_off.id, at(3, 0)).unwrap();
        assert!(matches!(
            engine.spawn_next(&one_off.id, at(3, 0)),
            Err(PortalError::Validation(_))
        ));
    }

    #[test]
    fn test_sweep_runs_full_lifecycle() {
        let engine = engine();
        let mut new = new_season(at(1, 0), at(8, 0));
        new.recurrence = Recurrence::Weekly;
        let s = engine.create_season(new, at(1, 0)).unwrap();

        let report = engine.sweep(at(1, 1)).unwrap();
        assert_eq!(report.activated, vec![s.id.clone()]);

        engine.record_match(report_at("m1", at(3, 0)), at(3, 0)).unwrap();

        let report = engine.sweep(at(8, 0)).unwrap();
        assert_eq!(report.ended, vec![s.id.clone()]);
        assert_eq!(report.spawned.len(), 1);
        assert_eq!(report.activated, report.spawned);
        assert!(report.failed.is_empty());

        let child = engine.season(&report.spawned[0]).unwrap();
        assert_eq!(child.status, SeasonStatus::Active);
        assert_eq!(child.name, "Spring #2");

        let parent = engine.leaderboard(&s.id, 10, 0).unwrap();
        assert!(parent.frozen);
        assert_eq!(parent.total, 2);
        assert_eq!(engine.leaderboard(&child.id, 10, 0).unwrap().total, 0);
    }

    fn report_at(id: &str, ended: DateTime<Utc>) -> MatchReport {
        report(id, "bedwars", ended)
    }

    #[test]
    fn test_sweep_twice_is_idempotent() {
        let engine = engine();
        let mut new = new_season(at(1, 0), at(8, 0));
        new.recurrence = Recurrence::Daily;
        let s = engine.create_season(new, at(1, 0)).unwrap();
        engine.activate(&s.id, at(1, 0)).unwrap();

        let first = engine.sweep(at(9, 12)).unwrap();
        assert!(!first.is_empty());
        let second = engine.sweep(at(9, 12)).unwrap();
        assert!(second.is_empty(), "second sweep changed {second:?}");

        // The daily successor skipped the elapsed days.
        let child = engine.season(&first.spawned[0]).unwrap();
        assert_eq!(child.starts_at, at(9, 0));
        assert_eq!(child.ends_at, at(10, 0));
    }

    #[test]
    fn test_sweep_archives_after_configured_age() {
        let settings = SeasonsConfig {
            archive_after_days: 7,
            ..Default::default()
        };
        let engine = SeasonEngine::new(init_db(":memory:").unwrap(), settings);
        let s = active_season(&engine);
        engine.end(&s.id, at(10, 0)).unwrap();

        assert!(engine.sweep(at(16, 0)).unwrap().archived.is_empty());
        assert_eq!(engine.sweep(at(17, 0)).unwrap().archived, vec![s.id.clone()]);
        assert_eq!(engine.season(&s.id).unwrap().status, SeasonStatus::Archived);
    }

    #[test]
    fn test_sweep_without_archiving() {
        let settings = SeasonsConfig {
            archive_after_days: 0,
            ..Default::default()
        };
        let engine = SeasonEngine::new(init_db(":memory:").unwrap(), settings);
        let s = active_season(&engine);
        engine.end(&s.id, at(2, 0)).unwrap();

        let report = engine.sweep(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()).unwrap();
        assert!(report.archived.is_empty());
        assert_eq!(engine.season(&s.id).unwrap().status, SeasonStatus::Ended);
    }

    #[test]
    fn test_stopping_recurrence_prevents_respawn() {
        let engine = engine();
        let mut new = new_season(at(1, 0), at(8, 0));
        new.recurrence = Recurrence::Weekly;
        let s = engine.create_season(new, at(1, 0)).unwrap();
        engine.activate(&s.id, at(1, 0)).unwrap();
        engine.end(&s.id, at(8, 0)).unwrap();

        let stop = SeasonPatch {
            recurrence: Some(Recurrence::None),
            ..Default::default()
        };
        engine.update_season(&s.id, stop, at(8, 0)).unwrap();

        assert!(engine.sweep(at(8, 1)).unwrap().spawned.is_empty());
    }

    #[test]
    fn test_sweep_failure_does_not_block_other_seasons() {
        let engine = engine();
        let mut weekly = new_season(at(1, 0), at(8, 0));
        weekly.recurrence = Recurrence::Weekly;
        let a = engine.create_season(weekly, at(1, 0)).unwrap();
        engine.activate(&a.id, at(1, 0)).unwrap();
        let b = engine
            .create_season(new_season(at(2, 0), at(20, 0)), at(1, 0))
            .unwrap();

        {
            let conn = engine.db().lock().unwrap();
            conn.execute_batch(
                "CREATE TRIGGER block_successor BEFORE INSERT ON seasons
                 WHEN NEW.parent_id IS NOT NULL
                 BEGIN SELECT RAISE(ABORT, 'successor blocked'); END;",
            )
            .unwrap();
        }

        let report = engine.sweep(at(8, 1)).unwrap();
        assert_eq!(report.ended, vec![a.id.clone()]);
        assert!(report.spawned.is_empty());
        assert_eq!(report.failed, vec![a.id.clone()]);
        assert_eq!(report.activated, vec![b.id.clone()]);
        assert_eq!(engine.season(&b.id).unwrap().status, SeasonStatus::Active);
        assert_eq!(engine.season(&a.id).unwrap().status, SeasonStatus::Ended);

        {
            let conn = engine.db().lock().unwrap();
            conn.execute_batch("DROP TRIGGER block_successor;").unwrap();
        }

        let report = engine.sweep(at(8, 2)).unwrap();
        assert_eq!(report.spawned.len(), 1);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_record_match_rejects_oversized_counters() {
        let engine = engine();
        let s = active_season(&engine);
        engine.record_match(report("m1", "bedwars", at(2, 12)), at(2, 12)).unwrap();

        let mut huge = report("m2", "bedwars", at(3, 12));
        huge.participants[0].kills = i64::MAX;
        assert!(matches!(
            engine.record_match(huge, at(3, 12)),
            Err(PortalError::Validation(_))
        ));

        let conn = engine.db().lock().unwrap();
        assert!(MatchRepo::new(&conn).get("m2").unwrap().is_none());
        let alex = PlayerRepo::new(&conn).get("alex").unwrap().unwrap();
        assert_eq!(alex.stats.kills, 5);
        drop(conn);

        let board = engine.leaderboard(&s.id, 10, 0).unwrap();
        assert_eq!(board.entries[0].player_uuid, "alex");
        assert_eq!(board.entries[0].stats.kills, 5);
    }

    #[test]
    fn test_not_found() {
        let engine = engine();
        assert!(matches!(engine.season("nope"), Err(PortalError::NotFound(_))));
        assert!(matches!(
            engine.leaderboard("nope", 10, 0),
            Err(PortalError::NotFound(_))
        ));
    }
}
