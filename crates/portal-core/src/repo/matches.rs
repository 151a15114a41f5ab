//! Match repository for database operations.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Result as SqliteResult};

use crate::models::{Match, MatchParticipant, MatchReport};

/// Repository for match database operations.
pub struct MatchRepo<'c> {
    conn: &'c Connection,
}

/// Filter options for listing matches.
#[derive(Debug)]
pub struct MatchFilter {
    /// Only matches this player took part in.
    pub player: Option<String>,
    /// Only matches of this game mode.
    pub game_mode: Option<String>,
    /// Maximum number of results to return.
    pub limit: i64,
    /// Number of results to skip.
    pub offset: i64,
}

impl Default for MatchFilter {
    fn default() -> Self {
        Self {
            player: None,
            game_mode: None,
            limit: 20,
            offset: 0,
        }
    }
}

impl<'c> MatchRepo<'c> {
    /// Create a new match repository over the given connection.
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Store a match report and its participant lines.
    ///
    /// Participants must already exist in `players`. Returns `false` without
    /// touching anything when a match with the same ID is already stored.
    pub fn insert(&self, report: &MatchReport, recorded_at: DateTime<Utc>) -> SqliteResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO matches
                (id, game_mode, server, started_at, ended_at, winner_team, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            (
                &report.id,
                &report.game_mode,
                &report.server,
                report.started_at,
                report.ended_at,
                &report.winner_team,
                recorded_at,
            ),
        )?;
        if inserted == 0 {
            return Ok(false);
        }

        let mut stmt = self.conn.prepare(
            "INSERT INTO match_participants
                (match_id, player_uuid, team, kills, deaths, points, won)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for p in &report.participants {
            stmt.execute((
                &report.id, &p.uuid, &p.team, p.kills, p.deaths, p.points, p.won,
            ))?;
        }
        Ok(true)
    }

    /// Get a match by ID.
    ///
    /// Returns `None` if the match doesn't exist.
    pub fn get(&self, id: &str) -> SqliteResult<Option<Match>> {
        self.conn
            .query_row(
                "SELECT id, game_mode, server, started_at, ended_at, winner_team, recorded_at
                 FROM matches WHERE id = ?1",
                [id],
                Self::map_row,
            )
            .optional()
    }

    /// Get all participant lines for a match, best score first.
    pub fn participants(&self, match_id: &str) -> SqliteResult<Vec<MatchParticipant>> {
        let mut stmt = self.conn.prepare(
            "SELECT mp.player_uuid, p.name, mp.team, mp.kills, mp.deaths, mp.points, mp.won
             FROM match_participants mp
             JOIN players p ON p.uuid = mp.player_uuid
             WHERE mp.match_id = ?1
             ORDER BY mp.points DESC, mp.kills DESC, mp.player_uuid ASC",
        )?;

        let participants = stmt
            .query_map([match_id], |row| {
                Ok(MatchParticipant {
                    player_uuid: row.get(0)?,
                    player_name: row.get(1)?,
                    team: row.get(2)?,
                    kills: row.get(3)?,
                    deaths: row.get(4)?,
                    points: row.get(5)?,
                    won: row.get(6)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(participants)
    }

    /// List matches with optional filtering.
    ///
    /// Results are ordered by end time (most recent first).
    pub fn list(&self, filter: &MatchFilter) -> SqliteResult<Vec<Match>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.id, m.game_mode, m.server, m.started_at, m.ended_at, m.winner_team,
                    m.recorded_at
             FROM matches m
             WHERE (?1 IS NULL OR EXISTS (
                        SELECT 1 FROM match_participants mp
                        WHERE mp.match_id = m.id AND mp.player_uuid = ?1))
               AND (?2 IS NULL OR m.game_mode = ?2)
             ORDER BY m.ended_at DESC, m.id ASC
             LIMIT ?3 OFFSET ?4",
        )?;

        let matches = stmt
            .query_map(
                (&filter.player, &filter.game_mode, filter.limit, filter.offset),
                Self::map_row,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(matches)
    }

    /// IDs of matches that ended in `[from, to)`, oldest first, optionally
    /// restricted to one game mode.
    pub fn in_window(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        game_mode: Option<&str>,
    ) -> SqliteResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM matches
             WHERE ended_at >= ?1 AND ended_at < ?2
               AND (?3 IS NULL OR game_mode = ?3)
             ORDER BY ended_at ASC, id ASC",
        )?;
        let ids = stmt
            .query_map((from, to, game_mode), |row| row.get(0))?
            .collect::<SqliteResult<Vec<String>>>()?;
        Ok(ids)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Match> {
        Ok(Match {
            id: row.get(0)?,
            game_mode: row.get(1)?,
            server: row.get(2)?,
            started_at: row.get(3)?,
            ended_at: row.get(4)?,
            winner_team: row.get(5)?,
            recorded_at: row.get(6)?,
        })
    }
}
