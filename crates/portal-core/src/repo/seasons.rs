//! Season repository for database operations.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Result as SqliteResult};

use crate::models::Season;
use crate::season::SeasonStatus;

const COLUMNS: &str = "id, name, description, status, ranking_mode, game_mode, starts_at, ends_at,
     min_matches, recurrence, iteration, parent_id, created_at, ended_at, frozen_at, archived_at";

/// Repository for season database operations.
pub struct SeasonRepo<'c> {
    conn: &'c Connection,
}

impl<'c> SeasonRepo<'c> {
    /// Create a new season repository over the given connection.
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert a new season.
    pub fn insert(&self, season: &Season) -> SqliteResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO seasons ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
            ),
            rusqlite::params![
                season.id,
                season.name,
                season.description,
                season.status,
                season.ranking_mode,
                season.game_mode,
                season.starts_at,
                season.ends_at,
                season.min_matches,
                season.recurrence,
                season.iteration,
                season.parent_id,
                season.created_at,
                season.ended_at,
                season.frozen_at,
                season.archived_at,
            ],
        )?;
        Ok(())
    }

    /// Get a season by ID.
    ///
    /// Returns `None` if the season doesn't exist.
    pub fn get(&self, id: &str) -> SqliteResult<Option<Season>> {
        self.conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM seasons WHERE id = ?1"),
                [id],
                Self::map_row,
            )
            .optional()
    }

    /// List seasons, newest window first, optionally by status.
    pub fn list(&self, status: Option<SeasonStatus>) -> SqliteResult<Vec<Season>> {
        self.query(
            "WHERE (?1 IS NULL OR status = ?1) ORDER BY starts_at DESC, id ASC",
            [status],
        )
    }

    /// Write back every field except `status`.
    ///
    /// Status changes go through [`SeasonRepo::set_status`].
    pub fn update(&self, season: &Season) -> SqliteResult<bool> {
        let changed = self.conn.execute(
            "UPDATE seasons SET
                name = ?2, description = ?3, ranking_mode = ?4, game_mode = ?5,
                starts_at = ?6, ends_at = ?7, min_matches = ?8, recurrence = ?9,
                ended_at = ?10, frozen_at = ?11, archived_at = ?12
             WHERE id = ?1",
            rusqlite::params![
                season.id,
                season.name,
                season.description,
                season.ranking_mode,
                season.game_mode,
                season.starts_at,
                season.ends_at,
                season.min_matches,
                season.recurrence,
                season.ended_at,
                season.frozen_at,
                season.archived_at,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Move a season from `from` to `to`.
    ///
    /// Returns `false` if the season is not currently in `from`, which means
    /// another writer got there first.
    pub fn set_status(&self, id: &str, from: SeasonStatus, to: SeasonStatus) -> SqliteResult<bool> {
        let changed = self.conn.execute(
            "UPDATE seasons SET status = ?3 WHERE id = ?1 AND status = ?2",
            (id, from, to),
        )?;
        Ok(changed > 0)
    }

    /// Delete a season. Returns `false` if it did not exist.
    pub fn delete(&self, id: &str) -> SqliteResult<bool> {
        let deleted = self.conn.execute("DELETE FROM seasons WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    /// Active seasons whose window contains `ts`.
    pub fn active_at(&self, ts: DateTime<Utc>) -> SqliteResult<Vec<Season>> {
        self.query(
            "WHERE status = 'active' AND starts_at <= ?1 AND ends_at > ?1
             ORDER BY starts_at ASC, id ASC",
            [ts],
        )
    }

    /// Drafts whose window has started and not yet finished.
    pub fn due_for_activation(&self, now: DateTime<Utc>) -> SqliteResult<Vec<Season>> {
        self.query(
            "WHERE status = 'draft' AND starts_at <= ?1 AND ends_at > ?1
             ORDER BY starts_at ASC, id ASC",
            [now],
        )
    }

    /// Active seasons whose window is over.
    pub fn due_for_ending(&self, now: DateTime<Utc>) -> SqliteResult<Vec<Season>> {
        self.query(
            "WHERE status = 'active' AND ends_at <= ?1 ORDER BY ends_at ASC, id ASC",
            [now],
        )
    }

    /// Ended or archived recurring seasons that have no successor yet.
    pub fn ended_without_successor(&self) -> SqliteResult<Vec<Season>> {
        self.query(
            "WHERE status IN ('ended', 'archived') AND recurrence != 'none'
               AND NOT EXISTS (SELECT 1 FROM seasons c WHERE c.parent_id = seasons.id)
             ORDER BY ends_at ASC, id ASC",
            [],
        )
    }

    /// Ended seasons that actually ended at or before `cutoff`.
    pub fn due_for_archive(&self, cutoff: DateTime<Utc>) -> SqliteResult<Vec<Season>> {
        self.query(
            "WHERE status = 'ended' AND ended_at IS NOT NULL AND ended_at <= ?1
             ORDER BY ended_at ASC, id ASC",
            [cutoff],
        )
    }

    /// The season spawned from `parent_id`, if any.
    pub fn child_of(&self, parent_id: &str) -> SqliteResult<Option<Season>> {
        self.conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM seasons WHERE parent_id = ?1"),
                [parent_id],
                Self::map_row,
            )
            .optional()
    }

    fn query<P: rusqlite::Params>(&self, clause: &str, params: P) -> SqliteResult<Vec<Season>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {COLUMNS} FROM seasons {clause}"))?;
        let seasons = stmt
            .query_map(params, Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(seasons)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Season> {
        Ok(Season {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            status: row.get(3)?,
            ranking_mode: row.get(4)?,
            game_mode: row.get(5)?,
            starts_at: row.get(6)?,
            ends_at: row.get(7)?,
            min_matches: row.get(8)?,
            recurrence: row.get(9)?,
            iteration: row.get(10)?,
            parent_id: row.get(11)?,
            created_at: row.get(12)?,
            ended_at: row.get(13)?,
            frozen_at: row.get(14)?,
            archived_at: row.get(15)?,
        })
    }
}
