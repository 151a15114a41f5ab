//! Error type shared by the repositories and the season engine.

use thiserror::Error;

use crate::season::SeasonStatus;

/// Errors raised by portal operations.
#[derive(Error, Debug)]
pub enum PortalError {
    /// Underlying SQLite failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// The requested entity does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// Input failed validation.
    #[error("invalid input: {0}")]
    Validation(String),
    /// A season status change that the state machine does not allow.
    #[error("cannot move season from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: SeasonStatus,
        /// Requested status.
        to: SeasonStatus,
    },
    /// The request conflicts with the current state of the entity.
    #[error("{0}")]
    Conflict(String),
    /// The season has ended and its ranking inputs can no longer change.
    #[error("season {0} is frozen")]
    Frozen(String),
    /// A thread panicked while holding the database lock.
    #[error("database lock poisoned")]
    LockPoisoned,
}

/// Result alias for portal operations.
pub type PortalResult<T> = Result<T, PortalError>;

impl PortalError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
