//! Repository modules for database operations.
//!
//! Repositories borrow a connection rather than the pool so the season
//! engine can run several of them inside one transaction.

pub mod matches;
pub mod players;
pub mod rankings;
pub mod seasons;
pub mod standings;

pub use matches::{MatchFilter, MatchRepo};
pub use players::PlayerRepo;
pub use rankings::RankingRepo;
pub use seasons::SeasonRepo;
pub use standings::StandingRepo;

/// Applies limit/offset paging to an in-memory list.
pub(crate) fn page<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}
