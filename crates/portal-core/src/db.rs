//! Database module for the portal.

use rusqlite::{Connection, Result as SqliteResult};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{PortalError, PortalResult};

/// Thread-safe database connection pool.
pub type DbPool = Arc<Mutex<Connection>>;

/// Initialize database with schema.
///
/// Creates all tables used by the portal:
/// - `players`: known players with all-time counters
/// - `matches` / `match_participants`: reported matches
/// - `seasons`: season definitions and lifecycle timestamps
/// - `season_matches`: which matches were counted toward which season
/// - `season_standings`: per-season counters per player
/// - `season_rankings`: frozen final leaderboards
///
/// The server and the worker open the same file, so a busy timeout lets one
/// wait for the other's write transaction instead of failing.
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file (use `:memory:` for in-memory)
///
/// # Errors
///
/// Returns an error if the database cannot be opened or schema creation fails.
pub fn init_db<P: AsRef<Path>>(path: P) -> SqliteResult<DbPool> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(5))?;

    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS players (
            uuid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            first_seen TEXT NOT NULL,
            last_seen TEXT NOT NULL,
            matches INTEGER NOT NULL DEFAULT 0,
            wins INTEGER NOT NULL DEFAULT 0,
            losses INTEGER NOT NULL DEFAULT 0,
            kills INTEGER NOT NULL DEFAULT 0,
            deaths INTEGER NOT NULL DEFAULT 0,
            points INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS matches (
            id TEXT PRIMARY KEY,
            game_mode TEXT NOT NULL,
            server TEXT,
            started_at TEXT NOT NULL,
            ended_at TEXT NOT NULL,
            winner_team TEXT,
            recorded_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS match_participants (
            match_id TEXT NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
            player_uuid TEXT NOT NULL REFERENCES players(uuid),
            team TEXT,
            kills INTEGER NOT NULL DEFAULT 0,
            deaths INTEGER NOT NULL DEFAULT 0,
            points INTEGER NOT NULL DEFAULT 0,
            won INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (match_id, player_uuid)
        );

        CREATE INDEX IF NOT EXISTS idx_matches_ended ON matches(ended_at);
        CREATE INDEX IF NOT EXISTS idx_participants_player ON match_participants(player_uuid);

        CREATE TABLE IF NOT EXISTS seasons (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            ranking_mode TEXT NOT NULL DEFAULT 'points',
            game_mode TEXT,
            starts_at TEXT NOT NULL,
            ends_at TEXT NOT NULL,
            min_matches INTEGER NOT NULL DEFAULT 0,
            recurrence TEXT NOT NULL DEFAULT 'none',
            iteration INTEGER NOT NULL DEFAULT 1,
            parent_id TEXT UNIQUE REFERENCES seasons(id) ON DELETE SET NULL,
            created_at TEXT NOT NULL,
            ended_at TEXT,
            frozen_at TEXT,
            archived_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_seasons_status ON seasons(status);

        CREATE TABLE IF NOT EXISTS season_matches (
            season_id TEXT NOT NULL REFERENCES seasons(id) ON DELETE CASCADE,
            match_id TEXT NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
            attributed_at TEXT NOT NULL,
            PRIMARY KEY (season_id, match_id)
        );

        CREATE TABLE IF NOT EXISTS season_standings (
            season_id TEXT NOT NULL REFERENCES seasons(id) ON DELETE CASCADE,
            player_uuid TEXT NOT NULL REFERENCES players(uuid),
            matches INTEGER NOT NULL DEFAULT 0,
            wins INTEGER NOT NULL DEFAULT 0,
            losses INTEGER NOT NULL DEFAULT 0,
            kills INTEGER NOT NULL DEFAULT 0,
            deaths INTEGER NOT NULL DEFAULT 0,
            points INTEGER NOT NULL DEFAULT 0,
            last_match_at TEXT,
            PRIMARY KEY (season_id, player_uuid)
        );

        CREATE INDEX IF NOT EXISTS idx_standings_player ON season_standings(player_uuid);

        CREATE TABLE IF NOT EXISTS season_rankings (
            season_id TEXT NOT NULL REFERENCES seasons(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            rank INTEGER NOT NULL,
            player_uuid TEXT NOT NULL,
            player_name TEXT NOT NULL,
            score REAL NOT NULL,
            matches INTEGER NOT NULL,
            wins INTEGER NOT NULL,
            losses INTEGER NOT NULL,
            kills INTEGER NOT NULL,
            deaths INTEGER NOT NULL,
            points INTEGER NOT NULL,
            PRIMARY KEY (season_id, position),
            UNIQUE (season_id, player_uuid)
        );
        ",
    )?;

    Ok(Arc::new(Mutex::new(conn)))
}

/// Locks the shared connection.
///
/// # Errors
///
/// Returns [`PortalError::LockPoisoned`] if a previous holder panicked.
pub fn lock(db: &DbPool) -> PortalResult<MutexGuard<'_, Connection>> {
    db.lock().map_err(|_| PortalError::LockPoisoned)
}
