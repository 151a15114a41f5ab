//! Player repository for database operations.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Result as SqliteResult};

use crate::models::{Player, PlayerSeasonEntry};
use crate::ranking::{self, Contender, RankedEntry, RankingMode, StatLine};

use super::page;

/// Repository for player database operations.
pub struct PlayerRepo<'c> {
    conn: &'c Connection,
}

impl<'c> PlayerRepo<'c> {
    /// Create a new player repository over the given connection.
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Record that a player was seen at `at`.
    ///
    /// Creates the player on first sight. Later reports update the name
    /// only when they are not older than the latest one already stored, so a
    /// late match report cannot roll back a rename.
    pub fn upsert_seen(&self, uuid: &str, name: &str, at: DateTime<Utc>) -> SqliteResult<()> {
        self.conn.execute(
            "INSERT INTO players (uuid, name, first_seen, last_seen)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(uuid) DO UPDATE SET
                name = CASE WHEN excluded.last_seen >= players.last_seen
                            THEN excluded.name ELSE players.name END,
                first_seen = MIN(players.first_seen, excluded.first_seen),
                last_seen = MAX(players.last_seen, excluded.last_seen)",
            (uuid, name, at),
        )?;
        Ok(())
    }

    /// Add a stat line to the player's all-time counters.
    pub fn add_totals(&self, uuid: &str, line: &StatLine) -> SqliteResult<()> {
        self.conn.execute(
            "UPDATE players SET
                matches = matches + ?1,
                wins = wins + ?2,
                losses = losses + ?3,
                kills = kills + ?4,
                deaths = deaths + ?5,
                points = points + ?6
             WHERE uuid = ?7",
            (
                line.matches,
                line.wins,
                line.losses,
                line.kills,
                line.deaths,
                line.points,
                uuid,
            ),
        )?;
        Ok(())
    }

    /// Get a player by UUID.
    ///
    /// Returns `None` if the player doesn't exist.
    pub fn get(&self, uuid: &str) -> SqliteResult<Option<Player>> {
        self.conn
            .query_row(
                "SELECT uuid, name, first_seen, last_seen,
                        matches, wins, losses, kills, deaths, points
                 FROM players WHERE uuid = ?1",
                [uuid],
                Self::map_row,
            )
            .optional()
    }

    /// Find players whose name starts with `prefix` (case-insensitive).
    pub fn search(&self, prefix: &str, limit: i64) -> SqliteResult<Vec<Player>> {
        let pattern = format!("{}%", prefix.replace('%', "").replace('_', ""));
        let mut stmt = self.conn.prepare(
            "SELECT uuid, name, first_seen, last_seen,
                    matches, wins, losses, kills, deaths, points
             FROM players WHERE name LIKE ?1
             ORDER BY name ASC LIMIT ?2",
        )?;
        let players = stmt
            .query_map((pattern, limit), Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(players)
    }

    /// All players as ranking input.
    pub fn contenders(&self) -> SqliteResult<Vec<Contender>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, name, matches, wins, losses, kills, deaths, points FROM players",
        )?;
        let contenders = stmt
            .query_map([], |row| {
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

    /// All-time leaderboard page and the total number of ranked players.
    pub fn leaderboard(
        &self,
        mode: RankingMode,
        limit: i64,
        offset: i64,
    ) -> SqliteResult<(i64, Vec<RankedEntry>)> {
        // Players who only joined and never finished a match are not ranked.
        let ranked = ranking::rank(mode, self.contenders()?, 1);
        let total = ranked.len() as i64;
        Ok((total, page(ranked, limit, offset)))
    }

    /// Seasons the player has standings in, newest first, with the final
    /// rank for frozen seasons.
    pub fn season_history(&self, uuid: &str) -> SqliteResult<Vec<PlayerSeasonEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.name, s.status, s.ranking_mode, r.rank,
                    st.matches, st.wins, st.losses, st.kills, st.deaths, st.points
             FROM season_standings st
             JOIN seasons s ON s.id = st.season_id
             LEFT JOIN season_rankings r
                ON r.season_id = st.season_id AND r.player_uuid = st.player_uuid
             WHERE st.player_uuid = ?1
             ORDER BY s.starts_at DESC",
        )?;
        let history = stmt
            .query_map([uuid], |row| {
                Ok(PlayerSeasonEntry {
                    season_id: row.get(0)?,
                    season_name: row.get(1)?,
                    status: row.get(2)?,
                    ranking_mode: row.get(3)?,
                    rank: row.get(4)?,
                    stats: StatLine {
                        matches: row.get(5)?,
                        wins: row.get(6)?,
                        losses: row.get(7)?,
                        kills: row.get(8)?,
                        deaths: row.get(9)?,
                        points: row.get(10)?,
                    },
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(history)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Player> {
        Ok(Player {
            uuid: row.get(0)?,
            name: row.get(1)?,
            first_seen: row.get(2)?,
            last_seen: row.get(3)?,
            stats: StatLine {
                matches: row.get(4)?,
                wins: row.get(5)?,
                losses: row.get(6)?,
                kills: row.get(7)?,
                deaths: row.get(8)?,
                points: row.get(9)?,
            },
        })
    }
}
