//! Season status state machine and recurrence arithmetic.

use chrono::{DateTime, Duration, Months, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PortalError, PortalResult};

/// Lifecycle status of a season.
///
/// Seasons only move forward: `draft -> active -> ended -> archived`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonStatus {
    /// Configured but not yet collecting matches.
    Draft,
    /// Collecting matches; leaderboard is computed live.
    Active,
    /// Finished; the ranking has been frozen.
    Ended,
    /// Finished and hidden from the default listings.
    Archived,
}

impl SeasonStatus {
    /// Wire and storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Ended => "ended",
            Self::Archived => "archived",
        }
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: SeasonStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Active) | (Self::Active, Self::Ended) | (Self::Ended, Self::Archived)
        )
    }

    /// Validates a transition and returns the new status.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::InvalidTransition`] for any edge outside the
    /// forward chain.
    pub fn transition(self, next: SeasonStatus) -> PortalResult<SeasonStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(PortalError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Ended and archived seasons carry an immutable frozen ranking.
    pub fn is_frozen(self) -> bool {
        matches!(self, Self::Ended | Self::Archived)
    }
}

impl fmt::Display for SeasonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeasonStatus {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "ended" => Ok(Self::Ended),
            "archived" => Ok(Self::Archived),
            other => Err(PortalError::validation(format!(
                "unknown season status '{other}'"
            ))),
        }
    }
}

impl ToSql for SeasonStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SeasonStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: PortalError| FromSqlError::Other(Box::new(e)))
    }
}

/// Policy for spawning the next iteration of a season once it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    /// One-off season.
    #[default]
    None,
    /// Next iteration lasts one day.
    Daily,
    /// Next iteration lasts seven days.
    Weekly,
    /// Next iteration lasts one calendar month.
    Monthly,
    /// Next iteration lasts one calendar year.
    Yearly,
}

impl Recurrence {
    /// Wire and storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Whether ending a season with this policy spawns a successor.
    pub fn is_recurring(self) -> bool {
        self != Self::None
    }

    /// Adds one period to `ts`.
    ///
    /// Calendar periods clamp to the last day of a shorter month
    /// (Jan 31 + 1 month = Feb 28/29). Returns `None` for
    /// [`Recurrence::None`] or on overflow.
    pub fn advance(self, ts: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::None => None,
            Self::Daily => ts.checked_add_signed(Duration::days(1)),
            Self::Weekly => ts.checked_add_signed(Duration::weeks(1)),
            Self::Monthly => ts.checked_add_months(Months::new(1)),
            Self::Yearly => ts.checked_add_months(Months::new(12)),
        }
    }

    /// Window of the iteration following a season that ended at `prev_end`.
    ///
    /// The window starts where the previous one stopped. Periods that are
    /// entirely in the past at `now` are skipped so a sweep that was down for
    /// a while does not produce a chain of empty seasons.
    pub fn next_window(
        self,
        prev_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let mut start = prev_end;
        let mut end = self.advance(start)?;
        while end <= now {
            start = end;
            end = self.advance(start)?;
        }
        Some((start, end))
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recurrence {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(PortalError::validation(format!(
                "unknown recurrence '{other}'"
            ))),
        }
    }
}

impl ToSql for Recurrence {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Recurrence {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: PortalError| FromSqlError::Other(Box::new(e)))
    }
}

/// Display name for iteration `iteration` of a recurring season.
///
/// A trailing ` #<n>` from the previous iteration is replaced, so
/// `"Weekly Cup #3"` becomes `"Weekly Cup #4"` and `"Weekly Cup"` becomes
/// `"Weekly Cup #2"`.
pub fn next_iteration_name(name: &str, iteration: i64) -> String {
    let base = match name.rsplit_once(" #") {
        Some((head, tail)) if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) => {
            head
        }
        _ => name,
    };
    format!("{base} #{iteration}")
}
