//! Ranking modes and leaderboard ordering.
//!
//! The same ordering is used for live season leaderboards, frozen snapshots
//! and the all-time player leaderboard.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::PortalError;

/// The statistic a leaderboard is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMode {
    /// Total wins.
    Wins,
    /// Wins divided by matches played.
    WinRate,
    /// Total kills.
    Kills,
    /// Kills divided by deaths (deaths floored at one).
    Kd,
    /// Total points.
    #[default]
    Points,
}

impl RankingMode {
    /// Wire and storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wins => "wins",
            Self::WinRate => "win_rate",
            Self::Kills => "kills",
            Self::Kd => "kd",
            Self::Points => "points",
        }
    }

    /// Score of a stat line under this mode. Higher is better.
    pub fn score(self, stats: &StatLine) -> f64 {
        match self {
            Self::Wins => stats.wins as f64,
            Self::WinRate => {
                if stats.matches == 0 {
                    0.0
                } else {
                    stats.wins as f64 / stats.matches as f64
                }
            }
            Self::Kills => stats.kills as f64,
            Self::Kd => stats.kills as f64 / stats.deaths.max(1) as f64,
            Self::Points => stats.points as f64,
        }
    }
}

impl fmt::Display for RankingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingMode {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wins" => Ok(Self::Wins),
            "win_rate" => Ok(Self::WinRate),
            "kills" => Ok(Self::Kills),
            "kd" => Ok(Self::Kd),
            "points" => Ok(Self::Points),
            other => Err(PortalError::Validation(format!(
                "unknown ranking mode '{other}'"
            ))),
        }
    }
}

impl ToSql for RankingMode {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RankingMode {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: PortalError| FromSqlError::Other(Box::new(e)))
    }
}

/// Aggregated counters for one player, either all-time or within a season.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatLine {
    /// Matches played.
    pub matches: i64,
    /// Matches won.
    pub wins: i64,
    /// Matches lost.
    pub losses: i64,
    /// Kills.
    pub kills: i64,
    /// Deaths.
    pub deaths: i64,
    /// Points.
    pub points: i64,
}

impl StatLine {
    /// Kill/death ratio with deaths floored at one.
    pub fn kd(&self) -> f64 {
        RankingMode::Kd.score(self)
    }

    /// Wins per match, zero without matches.
    pub fn win_rate(&self) -> f64 {
        RankingMode::WinRate.score(self)
    }
}

/// A player going into a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contender {
    /// Player UUID.
    pub player_uuid: String,
    /// Last known player name.
    pub player_name: String,
    /// Counters to rank on.
    #[serde(flatten)]
    pub stats: StatLine,
}

/// A player's place on a leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// Competition rank; tied scores share a rank.
    pub rank: i64,
    /// 1-based index in the sorted leaderboard.
    pub position: i64,
    /// Player UUID.
    pub player_uuid: String,
    /// Player name at ranking time.
    pub player_name: String,
    /// Score under the leaderboard's ranking mode.
    pub score: f64,
    /// Counters the score was derived from.
    #[serde(flatten)]
    pub stats: StatLine,
}

fn compare(mode: RankingMode, a: &Contender, b: &Contender) -> Ordering {
    mode.score(&b.stats)
        .total_cmp(&mode.score(&a.stats))
        .then_with(|| b.stats.wins.cmp(&a.stats.wins))
        .then_with(|| b.stats.kills.cmp(&a.stats.kills))
        .then_with(|| a.stats.matches.cmp(&b.stats.matches))
        .then_with(|| a.player_uuid.cmp(&b.player_uuid))
}

/// Orders contenders into a leaderboard.
///
/// Contenders with fewer than `min_matches` matches are left out. Ordering is
/// score descending, then wins descending, kills descending, matches
/// ascending and finally player UUID, so the result is deterministic.
/// Ranks follow standard competition ranking on the score alone: equal
/// scores share a rank and the next distinct score skips ahead (1, 1, 3).
pub fn rank(mode: RankingMode, contenders: Vec<Contender>, min_matches: i64) -> Vec<RankedEntry> {
    let mut eligible: Vec<Contender> = contenders
        .into_iter()
        .filter(|c| c.stats.matches >= min_matches)
        .collect();
    eligible.sort_by(|a, b| compare(mode, a, b));

    let mut ranked = Vec::with_capacity(eligible.len());
    let mut current_rank = 0;
    let mut previous_score: Option<f64> = None;

    for (index, contender) in eligible.into_iter().enumerate() {
        let position = index as i64 + 1;
        let score = mode.score(&contender.stats);
        if previous_score != Some(score) {
            current_rank = position;
            previous_score = Some(score);
        }
        ranked.push(RankedEntry {
            rank: current_rank,
            position,
            player_uuid: contender.player_uuid,
            player_name: contender.player_name,
            score,
            stats: contender.stats,
        });
    }

    ranked
}
