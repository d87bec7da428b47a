//! # Pulse Core Types
//!
//! The shared vocabulary of the popularity engine: games and their raw event
//! records, half-open UTC time windows, and the `ScoreRecord` every strategy
//! produces. This is a Layer 0 crate with no knowledge of storage or scoring.

pub mod enums;
pub mod error;
pub mod record;
pub mod structs;
pub mod window;

// Re-export the core types to provide a clean public API.
pub use enums::{EventSource, StrategyId};
pub use error::CoreError;
pub use record::{MetricValue, ScoreRecord};
pub use structs::{
    Contestant, ContestantId, Game, GameId, LeaderboardEntry, ScoreEvent, SessionEvent,
    UpvoteEvent,
};
pub use window::TimeWindow;
