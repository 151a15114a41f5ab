//! API and storage models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{PortalError, PortalResult};
use crate::ranking::{RankingMode, StatLine};
use crate::season::{Recurrence, SeasonStatus};

/// Largest kills, deaths or points value a single participant line may carry.
///
/// Counters are summed in SQLite integer columns, which turn into REAL on
/// overflow.
pub const MAX_MATCH_COUNTER: i64 = 1_000_000;

/// A player known to the portal, with all-time counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Game account UUID.
    pub uuid: String,
    /// Last reported name.
    pub name: String,
    /// First time any server reported this player.
    pub first_seen: DateTime<Utc>,
    /// Most recent report.
    pub last_seen: DateTime<Utc>,
    /// All-time counters.
    #[serde(flatten)]
    pub stats: StatLine,
}

/// One season a player took part in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeasonEntry {
    /// Season identifier.
    pub season_id: String,
    /// Season display name.
    pub season_name: String,
    /// Season status at query time.
    pub status: SeasonStatus,
    /// Ranking mode of the season.
    pub ranking_mode: RankingMode,
    /// Final rank for frozen seasons; `None` while live or when unqualified.
    pub rank: Option<i64>,
    /// Counters the player collected in the season.
    #[serde(flatten)]
    pub stats: StatLine,
}

/// Player page: all-time stats plus season history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// The player with all-time counters.
    #[serde(flatten)]
    pub player: Player,
    /// All-time kill/death ratio.
    pub kd: f64,
    /// All-time win rate.
    pub win_rate: f64,
    /// Seasons the player has standings in, newest first.
    pub seasons: Vec<PlayerSeasonEntry>,
}

/// Join event reported by a game-server plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSeen {
    /// Game account UUID.
    pub uuid: String,
    /// Current name.
    pub name: String,
}

/// A recorded match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Identifier assigned by the reporting server.
    pub id: String,
    /// Game mode, e.g. `bedwars`.
    pub game_mode: String,
    /// Reporting server name.
    pub server: Option<String>,
    /// When the match started.
    pub started_at: DateTime<Utc>,
    /// When the match ended; this is the timestamp used for season attribution.
    pub ended_at: DateTime<Utc>,
    /// Winning team, if the mode has teams.
    pub winner_team: Option<String>,
    /// When the portal stored the report.
    pub recorded_at: DateTime<Utc>,
}

/// One player's line in a recorded match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchParticipant {
    /// Player UUID.
    pub player_uuid: String,
    /// Player name at query time.
    pub player_name: String,
    /// Team, if the mode has teams.
    pub team: Option<String>,
    /// Kills in this match.
    pub kills: i64,
    /// Deaths in this match.
    pub deaths: i64,
    /// Points in this match.
    pub points: i64,
    /// Whether the player was on the winning side.
    pub won: bool,
}

impl MatchParticipant {
    /// Counters this line adds to a standing.
    pub fn stat_line(&self) -> StatLine {
        StatLine {
            matches: 1,
            wins: i64::from(self.won),
            losses: i64::from(!self.won),
            kills: self.kills,
            deaths: self.deaths,
            points: self.points,
        }
    }
}

/// Match with its participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDetail {
    /// The match.
    #[serde(flatten)]
    pub match_info: Match,
    /// Participant lines ordered by points descending.
    pub participants: Vec<MatchParticipant>,
}

/// Participant line in a plugin match report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantReport {
    /// Player UUID.
    pub uuid: String,
    /// Player name.
    pub name: String,
    /// Team, if any.
    #[serde(default)]
    pub team: Option<String>,
    /// Kills.
    #[serde(default)]
    pub kills: i64,
    /// Deaths.
    #[serde(default)]
    pub deaths: i64,
    /// Points.
    #[serde(default)]
    pub points: i64,
    /// Whether the player won.
    #[serde(default)]
    pub won: bool,
}

impl ParticipantReport {
    /// Counters this line adds to all-time totals.
    pub fn stat_line(&self) -> StatLine {
        StatLine {
            matches: 1,
            wins: i64::from(self.won),
            losses: i64::from(!self.won),
            kills: self.kills,
            deaths: self.deaths,
            points: self.points,
        }
    }
}

/// Finished match as reported by a game-server plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    /// Identifier unique across the network; reports are idempotent on it.
    pub id: String,
    /// Game mode.
    pub game_mode: String,
    /// Reporting server.
    #[serde(default)]
    pub server: Option<String>,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// End time.
    pub ended_at: DateTime<Utc>,
    /// Winning team.
    #[serde(default)]
    pub winner_team: Option<String>,
    /// Participant lines.
    pub participants: Vec<ParticipantReport>,
}

impl MatchReport {
    /// Checks the report before anything is written.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Validation`] for empty identifiers, an end before
    /// the start, no participants, duplicate participants, or counters that
    /// are negative or above [`MAX_MATCH_COUNTER`].
    pub fn validate(&self) -> PortalResult<()> {
        if self.id.trim().is_empty() {
            return Err(PortalError::validation("match id is required"));
        }
        if self.game_mode.trim().is_empty() {
            return Err(PortalError::validation("game_mode is required"));
        }
        if self.ended_at < self.started_at {
            return Err(PortalError::validation("ended_at is before started_at"));
        }
        if self.participants.is_empty() {
            return Err(PortalError::validation("a match needs participants"));
        }

        let mut seen = HashSet::new();
        for p in &self.participants {
            if p.uuid.trim().is_empty() || p.name.trim().is_empty() {
                return Err(PortalError::validation(
                    "participant uuid and name are required",
                ));
            }
            if !seen.insert(p.uuid.as_str()) {
                return Err(PortalError::Validation(format!(
                    "participant {} reported twice",
                    p.uuid
                )));
            }
            if p.kills < 0 || p.deaths < 0 || p.points < 0 {
                return Err(PortalError::Validation(format!(
                    "negative counters for participant {}",
                    p.uuid
                )));
            }
            if p.kills > MAX_MATCH_COUNTER
                || p.deaths > MAX_MATCH_COUNTER
                || p.points > MAX_MATCH_COUNTER
            {
                return Err(PortalError::Validation(format!(
                    "counters for participant {} exceed {MAX_MATCH_COUNTER}",
                    p.uuid
                )));
            }
        }
        Ok(())
    }
}

/// Result of ingesting a match report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestOutcome {
    /// Match identifier.
    pub match_id: String,
    /// False when the match had already been recorded.
    pub created: bool,
    /// Seasons the match was attributed to.
    pub seasons: Vec<String>,
}

/// A season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Lifecycle status.
    pub status: SeasonStatus,
    /// Leaderboard sort statistic.
    pub ranking_mode: RankingMode,
    /// Only matches of this game mode count; `None` counts all modes.
    pub game_mode: Option<String>,
    /// Window start (inclusive).
    pub starts_at: DateTime<Utc>,
    /// Window end (exclusive).
    pub ends_at: DateTime<Utc>,
    /// Matches needed to appear on the leaderboard.
    pub min_matches: i64,
    /// Successor policy.
    pub recurrence: Recurrence,
    /// Iteration number within a recurring series, starting at 1.
    pub iteration: i64,
    /// Season this one was spawned from.
    pub parent_id: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// When the season actually ended.
    pub ended_at: Option<DateTime<Utc>>,
    /// When the ranking snapshot was taken.
    pub frozen_at: Option<DateTime<Utc>>,
    /// When the season was archived.
    pub archived_at: Option<DateTime<Utc>>,
}

impl Season {
    /// Whether a match of `game_mode` ending at `ended_at` falls in this
    /// season's window and filter.
    pub fn covers(&self, game_mode: &str, ended_at: DateTime<Utc>) -> bool {
        self.starts_at <= ended_at
            && ended_at < self.ends_at
            && self.game_mode.as_deref().map_or(true, |m| m == game_mode)
    }
}

/// Input for creating a season.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSeason {
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Ranking mode, points when omitted.
    #[serde(default)]
    pub ranking_mode: RankingMode,
    /// Game-mode filter.
    #[serde(default)]
    pub game_mode: Option<String>,
    /// Window start.
    pub starts_at: DateTime<Utc>,
    /// Window end.
    pub ends_at: DateTime<Utc>,
    /// Qualification threshold; the configured default when omitted.
    #[serde(default)]
    pub min_matches: Option<i64>,
    /// Successor policy.
    #[serde(default)]
    pub recurrence: Recurrence,
}

/// Partial update of a season. Absent fields are left unchanged; an empty
/// string clears `description` or `game_mode`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeasonPatch {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New ranking mode.
    #[serde(default)]
    pub ranking_mode: Option<RankingMode>,
    /// New game-mode filter.
    #[serde(default)]
    pub game_mode: Option<String>,
    /// New window start.
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    /// New window end.
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    /// New qualification threshold.
    #[serde(default)]
    pub min_matches: Option<i64>,
    /// New successor policy.
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
}

impl SeasonPatch {
    /// True if the patch touches anything a frozen ranking depends on.
    ///
    /// Name, description and recurrence stay editable after a season ends;
    /// clearing the recurrence of an ended season stops its series.
    pub fn touches_ranking(&self) -> bool {
        self.ranking_mode.is_some()
            || self.game_mode.is_some()
            || self.starts_at.is_some()
            || self.ends_at.is_some()
            || self.min_matches.is_some()
    }

    /// True if the patch changes which matches count toward the season.
    pub fn touches_attribution(&self) -> bool {
        self.game_mode.is_some() || self.starts_at.is_some() || self.ends_at.is_some()
    }
}

/// Leaderboard page for a season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonLeaderboard {
    /// The season.
    pub season: Season,
    /// Whether the entries come from the frozen snapshot.
    pub frozen: bool,
    /// Total ranked players.
    pub total: i64,
    /// Ranked entries for the requested page.
    pub entries: Vec<crate::ranking::RankedEntry>,
}
