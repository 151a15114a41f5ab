//! Configuration file loading for the portal.
//!
//! Server, worker and engine settings all come from one TOML file,
//! `portal.toml` in the working directory unless a path is given.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// The file parsed but a value is out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// HTTP server settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Listen address. Defaults to `127.0.0.1:3000`.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory with the front-end build, served for unknown paths.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: default_static_dir(),
        }
    }
}

/// Database location.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite file. Defaults to `data/portal.db`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/portal.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Bearer tokens guarding the write endpoints.
///
/// A missing token disables its endpoint group entirely.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AuthConfig {
    /// Token presented by game-server plugins.
    pub plugin_token: Option<String>,
    /// Token presented by administrators.
    pub admin_token: Option<String>,
}

/// Season engine settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SeasonsConfig {
    /// Seconds between two worker sweeps. Defaults to 60.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Archive ended seasons this many days after they ended.
    /// Zero disables automatic archiving.
    #[serde(default = "default_archive_after_days")]
    pub archive_after_days: u32,
    /// Qualification threshold applied to seasons created without one.
    #[serde(default)]
    pub default_min_matches: i64,
    /// Default leaderboard page size.
    #[serde(default = "default_leaderboard_limit")]
    pub leaderboard_limit: i64,
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_archive_after_days() -> u32 {
    30
}

fn default_leaderboard_limit() -> i64 {
    50
}

impl SeasonsConfig {
    /// Age after which ended seasons are archived, if archiving is enabled.
    pub fn archive_after(&self) -> Option<chrono::Duration> {
        match self.archive_after_days {
            0 => None,
            days => Some(chrono::Duration::days(i64::from(days))),
        }
    }
}

impl Default for SeasonsConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            archive_after_days: default_archive_after_days(),
            default_min_matches: 0,
            leaderboard_limit: default_leaderboard_limit(),
        }
    }
}

/// Main portal configuration structure.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PortalConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// API tokens.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Season engine settings.
    #[serde(default)]
    pub seasons: SeasonsConfig,
}

impl PortalConfig {
    /// Loads the configuration from [`Self::config_path()`].
    ///
    /// Returns the defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// [`ConfigError::ParseError`] if it contains invalid TOML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::config_path())
    }

    /// Loads the configuration from an explicit path.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config: Self = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Returns the default configuration file path, `portal.toml`.
    pub fn config_path() -> PathBuf {
        PathBuf::from("portal.toml")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.seasons.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "seasons.sweep_interval_secs must be positive".to_string(),
            ));
        }
        if self.seasons.leaderboard_limit <= 0 {
            return Err(ConfigError::Invalid(
                "seasons.leaderboard_limit must be positive".to_string(),
            ));
        }
        if self.seasons.default_min_matches < 0 {
            return Err(ConfigError::Invalid(
                "seasons.default_min_matches cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}
