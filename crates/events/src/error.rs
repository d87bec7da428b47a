use core_types::{CoreError, GameId};
use thiserror::Error;

/// Failure of a read-only aggregate query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Event data unavailable: {0}")]
    DataUnavailable(String),
}

/// Failure to append an event to a store.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Game {0} not found")]
    UnknownGame(GameId),

    #[error("Game {0} is not active")]
    GameInactive(GameId),

    #[error("Invalid event: {0}")]
    InvalidEvent(#[from] CoreError),

    #[error("Failed to read event snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Event store unavailable: {0}")]
    StoreUnavailable(String),
}
