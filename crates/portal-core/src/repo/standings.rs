//! Per-season standings and match attribution.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Result as SqliteResult};

use crate::ranking::{Contender, StatLine};

/// Repository for season standings.
pub struct StandingRepo<'c> {
    conn: &'c Connection,
}

impl<'c> StandingRepo<'c> {
    /// Create a new standing repository over the given connection.
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Record that `match_id` counts toward `season_id`.
    ///
    /// Returns `false` if the match was already attributed, in which case the
    /// caller must not apply its counters again.
    pub fn mark_attributed(
        &self,
        season_id: &str,
        match_id: &str,
        at: DateTime<Utc>,
    ) -> SqliteResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO season_matches (season_id, match_id, attributed_at)
             VALUES (?1, ?2, ?3)",
            (season_id, match_id, at),
        )?;
        Ok(inserted > 0)
    }

    /// Add one participant's line to their standing in a season.
    pub fn apply(
        &self,
        season_id: &str,
        player_uuid: &str,
        line: &StatLine,
        match_ended_at: DateTime<Utc>,
    ) -> SqliteResult<()> {
        self.conn.execute(
            "INSERT INTO season_standings
                (season_id, player_uuid, matches, wins, losses, kills, deaths, points, last_match_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(season_id, player_uuid) DO UPDATE SET
                matches = matches + excluded.matches,
                wins = wins + excluded.wins,
                losses = losses + excluded.losses,
                kills = kills + excluded.kills,
                deaths = deaths + excluded.deaths,
                points = points + excluded.points,
                last_match_at = MAX(COALESCE(last_match_at, excluded.last_match_at),
                                    excluded.last_match_at)",
            rusqlite::params![
                season_id,
                player_uuid,
                line.matches,
                line.wins,
                line.losses,
                line.kills,
                line.deaths,
                line.points,
                match_ended_at,
            ],
        )?;
        Ok(())
    }

    /// Every standing in a season as ranking input.
    pub fn list(&self, season_id: &str) -> SqliteResult<Vec<Contender>> {
        let mut stmt = self.conn.prepare(
            "SELECT st.player_uuid, p.name,
                    st.matches, st.wins, st.losses, st.kills, st.deaths, st.points
             FROM season_standings st
             JOIN players p ON p.uuid = st.player_uuid
             WHERE st.season_id = ?1",
        )?;
        let contenders = stmt
            .query_map([season_id], |row| {
                Ok(Contender {
                    player_uuid: row.get(0)?,
                    player_name: row.get(1)?,
                    stats: StatLine {
                        matches: row.get(2)?,
                        wins: row.get(3)?,
                        losses: row.get(4)?,
                        kills: row.get(5)?,
                        deaths: row.get(6)?,
                        points: row.get(7)?,
                    },
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(contenders)
    }

    /// One player's counters in a season.
    pub fn get(&self, season_id: &str, player_uuid: &str) -> SqliteResult<Option<StatLine>> {
        self.conn
            .query_row(
                "SELECT matches, wins, losses, kills, deaths, points
                 FROM season_standings WHERE season_id = ?1 AND player_uuid = ?2",
                [season_id, player_uuid],
                |row| {
                    Ok(StatLine {
                        matches: row.get(0)?,
                        wins: row.get(1)?,
                        losses: row.get(2)?,
                        kills: row.get(3)?,
                        deaths: row.get(4)?,
                        points: row.get(5)?,
                    })
                },
            )
            .optional()
    }

    /// Number of matches attributed to a season.
    pub fn attributed_count(&self, season_id: &str) -> SqliteResult<i64> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM season_matches WHERE season_id = ?1",
            [season_id],
            |row| row.get(0),
        )
    }

    /// Drop all standings and attribution rows of a season.
    pub fn clear(&self, season_id: &str) -> SqliteResult<()> {
        self.conn
            .execute("DELETE FROM season_standings WHERE season_id = ?1", [season_id])?;
        self.conn
            .execute("DELETE FROM season_matches WHERE season_id = ?1", [season_id])?;
        Ok(())
    }
}
