//! Portal Core - season lifecycle and ranking engine for the stats portal.
//!
//! This crate owns the database schema, the repositories over it, and the
//! season engine that attributes matches to seasons, ranks players, freezes
//! final standings and spawns recurring seasons.
//!
//! # Modules
//!
//! - [`config`] - `portal.toml` loading
//! - [`db`] - SQLite schema and connection handling
//! - [`models`] - API and storage models
//! - [`season`] - season status state machine and recurrence arithmetic
//! - [`ranking`] - ranking modes and leaderboard ordering
//! - [`repo`] - repositories for players, matches, seasons and standings
//! - [`engine`] - the season engine and the lifecycle sweep

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod ranking;
pub mod repo;
pub mod season;

pub use engine::{SeasonEngine, SweepReport};
pub use error::{PortalError, PortalResult};
