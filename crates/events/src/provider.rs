use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{EventSource, Game, GameId, LeaderboardEntry, TimeWindow};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// How a fleet-wide maximum groups the underlying events before taking the max.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// One group per game per UTC calendar day.
    GameDay,
    /// One group per game.
    Game,
    /// A single group spanning the fleet.
    Fleet,
}

/// A metric whose maximum across every game is used to normalize per-game values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FleetMetric {
    /// Distinct session participants per game per day.
    DailyPlayers,
    /// Sessions started per game per day.
    DailySessions,
    /// Upvotes per game.
    Upvotes,
    /// Longest non-null session length, in minutes.
    SessionLength,
    /// Sessions open at `at`, per game.
    OpenSessions { at: DateTime<Utc> },
}

impl FleetMetric {
    pub fn grouping(&self) -> Grouping {
        match self {
            FleetMetric::DailyPlayers | FleetMetric::DailySessions => Grouping::GameDay,
            FleetMetric::Upvotes | FleetMetric::OpenSessions { .. } => Grouping::Game,
            FleetMetric::SessionLength => Grouping::Fleet,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FleetMetric::DailyPlayers => "max_daily_players",
            FleetMetric::DailySessions => "max_daily_sessions",
            FleetMetric::Upvotes => "max_upvotes",
            FleetMetric::SessionLength => "max_session_length_overall",
            FleetMetric::OpenSessions { .. } => "max_concurrent_players",
        }
    }
}

/// Narrows a score leaderboard to one game and/or one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardFilter {
    pub game: Option<GameId>,
    pub window: Option<TimeWindow>,
}

/// The read-only aggregate queries the scoring engine consumes.
///
/// Windows are half-open `[start, end)` in UTC and filter on the event's own
/// timestamp (`start_time` for sessions). All counts are non-negative. Any
/// backend failure is reported as `QueryError::DataUnavailable` and must never
/// be papered over with a zero.
#[async_trait]
pub trait EventQueryProvider: Send + Sync {
    /// Every game known to the record store, ordered by id.
    async fn list_games(&self) -> Result<Vec<Game>, QueryError>;

    async fn count_scores(&self, game: GameId, window: TimeWindow) -> Result<u64, QueryError>;

    async fn count_distinct_participants(
        &self,
        game: GameId,
        source: EventSource,
        window: TimeWindow,
    ) -> Result<u64, QueryError>;

    async fn count_sessions(&self, game: GameId, window: TimeWindow) -> Result<u64, QueryError>;

    /// Sessions with `start_time <= at` and an end that is missing or `>= at`.
    async fn count_active_sessions(&self, game: GameId, at: DateTime<Utc>) -> Result<u64, QueryError>;

    /// The longest non-null session length among sessions started in `window`.
    async fn max_session_length(
        &self,
        game: GameId,
        window: TimeWindow,
    ) -> Result<Option<u32>, QueryError>;

    async fn count_upvotes(&self, game: GameId, window: TimeWindow) -> Result<u64, QueryError>;

    /// Timestamp of the latest score event in `window`.
    async fn last_event_time(
        &self,
        game: GameId,
        window: TimeWindow,
    ) -> Result<Option<DateTime<Utc>>, QueryError>;

    /// The maximum of `metric` across all games, grouped per `metric.grouping()`.
    /// `None` when no group has any data.
    async fn fleet_max(&self, metric: FleetMetric, window: TimeWindow) -> Result<Option<u64>, QueryError>;

    /// Score events ordered by value descending, earliest first on ties.
    async fn top_scores(&self, filter: LeaderboardFilter) -> Result<Vec<LeaderboardEntry>, QueryError>;
}
