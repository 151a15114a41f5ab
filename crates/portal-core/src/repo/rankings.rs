//! Frozen season rankings.
//!
//! A snapshot is written once when a season ends and is read-only after that.

use rusqlite::{Connection, OptionalExtension, Result as SqliteResult};

use crate::ranking::{RankedEntry, StatLine};

const COLUMNS: &str = "rank, position, player_uuid, player_name, score,
     matches, wins, losses, kills, deaths, points";

/// Repository for frozen rankings.
pub struct RankingRepo<'c> {
    conn: &'c Connection,
}

impl<'c> RankingRepo<'c> {
    /// Create a new ranking repository over the given connection.
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Whether a snapshot exists for the season.
    pub fn has_frozen(&self, season_id: &str) -> SqliteResult<bool> {
        self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM season_rankings WHERE season_id = ?1)",
            [season_id],
            |row| row.get(0),
        )
    }

    /// Store the final ranking of a season.
    ///
    /// Rows are inserted, never replaced: writing a second snapshot for the
    /// same season fails on the primary key.
    pub fn write_frozen(&self, season_id: &str, entries: &[RankedEntry]) -> SqliteResult<()> {
        let mut stmt = self.conn.prepare(&format!(
            "INSERT INTO season_rankings (season_id, {COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ))?;
        for e in entries {
            stmt.execute(rusqlite::params![
                season_id,
                e.rank,
                e.position,
                e.player_uuid,
                e.player_name,
                e.score,
                e.stats.matches,
                e.stats.wins,
                e.stats.losses,
                e.stats.kills,
                e.stats.deaths,
                e.stats.points,
            ])?;
        }
        Ok(())
    }

    /// A page of the frozen ranking, in position order.
    pub fn frozen(&self, season_id: &str, limit: i64, offset: i64) -> SqliteResult<Vec<RankedEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM season_rankings WHERE season_id = ?1
             ORDER BY position ASC LIMIT ?2 OFFSET ?3"
        ))?;
        let entries = stmt
            .query_map((season_id, limit, offset), Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(entries)
    }

    /// Number of entries in the frozen ranking.
    pub fn frozen_count(&self, season_id: &str) -> SqliteResult<i64> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM season_rankings WHERE season_id = ?1",
            [season_id],
            |row| row.get(0),
        )
    }

    /// A player's frozen entry.
    pub fn frozen_for(&self, season_id: &str, player_uuid: &str) -> SqliteResult<Option<RankedEntry>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM season_rankings
                     WHERE season_id = ?1 AND player_uuid = ?2"
                ),
                [season_id, player_uuid],
                Self::map_row,
            )
            .optional()
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<RankedEntry> {
        Ok(RankedEntry {
            rank: row.get(0)?,
            position: row.get(1)?,
            player_uuid: row.get(2)?,
            player_name: row.get(3)?,
            score: row.get(4)?,
            stats: StatLine {
                matches: row.get(5)?,
                wins: row.get(6)?,
                losses: row.get(7)?,
                kills: row.get(8)?,
                deaths: row.get(9)?,
                points: row.get(10)?,
            },
        })
    }
}
