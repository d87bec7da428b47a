use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use core_types::{
    Contestant, ContestantId, EventSource, Game, GameId, LeaderboardEntry, ScoreEvent,
    SessionEvent, TimeWindow, UpvoteEvent,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{QueryError, RecordError};
use crate::provider::{EventQueryProvider, FleetMetric, LeaderboardFilter};

/// A serializable dump of every record the in-memory store holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventSnapshot {
    #[serde(default)]
    pub games: Vec<Game>,
    #[serde(default)]
    pub contestants: Vec<Contestant>,
    #[serde(default)]
    pub scores: Vec<ScoreEvent>,
    #[serde(default)]
    pub sessions: Vec<SessionEvent>,
    #[serde(default)]
    pub upvotes: Vec<UpvoteEvent>,
}

/// An append-only, process-local event store implementing `EventQueryProvider`.
///
/// Used for offline snapshots and as the reference backend in tests.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    data: RwLock<EventSnapshot>,
    unavailable: AtomicBool,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: EventSnapshot) -> Self {
        Self {
            data: RwLock::new(snapshot),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Loads a JSON-encoded `EventSnapshot`.
    pub fn from_reader(reader: impl Read) -> Result<Self, RecordError> {
        let snapshot: EventSnapshot = serde_json::from_reader(reader)?;
        tracing::debug!(
            games = snapshot.games.len(),
            scores = snapshot.scores.len(),
            sessions = snapshot.sessions.len(),
            upvotes = snapshot.upvotes.len(),
            "Loaded event snapshot"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn snapshot(&self) -> Result<EventSnapshot, RecordError> {
        let data = self
            .data
            .read()
            .map_err(|e| RecordError::StoreUnavailable(e.to_string()))?;
        Ok(data.clone())
    }

    /// Simulates an unreachable backend: every query fails until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn add_game(&self, game: Game) -> Result<(), RecordError> {
        self.write()?.games.push(game);
        Ok(())
    }

    pub fn add_contestant(&self, contestant: Contestant) -> Result<(), RecordError> {
        self.write()?.contestants.push(contestant);
        Ok(())
    }

    /// Starts or ends a game; only active games accept new scores.
    pub fn set_active(&self, game_id: GameId, is_active: bool) -> Result<(), RecordError> {
        let mut data = self.write()?;
        let game = data
            .games
            .iter_mut()
            .find(|g| g.id == game_id)
            .ok_or(RecordError::UnknownGame(game_id))?;
        game.is_active = is_active;
        Ok(())
    }

    pub fn record_score(&self, score: ScoreEvent) -> Result<(), RecordError> {
        let mut data = self.write()?;
        let game = data
            .games
            .iter()
            .find(|g| g.id == score.game_id)
            .ok_or(RecordError::UnknownGame(score.game_id))?;
        if !game.is_active {
            tracing::warn!(game_id = %score.game_id, "Rejected score for inactive game");
            return Err(RecordError::GameInactive(score.game_id));
        }
        data.scores.push(score);
        Ok(())
    }

    pub fn record_session(&self, session: SessionEvent) -> Result<(), RecordError> {
        if let Some(end) = session.end_time {
            if end < session.start_time {
                return Err(RecordError::InvalidEvent(core_types::CoreError::InvalidInput(
                    "end_time".to_string(),
                    format!("{end} is before session start {}", session.start_time),
                )));
            }
        }
        let mut data = self.write()?;
        if !data.games.iter().any(|g| g.id == session.game_id) {
            return Err(RecordError::UnknownGame(session.game_id));
        }
        data.sessions.push(session);
        Ok(())
    }

    pub fn record_upvote(&self, upvote: UpvoteEvent) -> Result<(), RecordError> {
        let mut data = self.write()?;
        if !data.games.iter().any(|g| g.id == upvote.game_id) {
            return Err(RecordError::UnknownGame(upvote.game_id));
        }
        data.upvotes.push(upvote);
        Ok(())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, EventSnapshot>, RecordError> {
        self.data
            .write()
            .map_err(|e| RecordError::StoreUnavailable(e.to_string()))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, EventSnapshot>, QueryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(QueryError::DataUnavailable(
                "in-memory store is marked unavailable".to_string(),
            ));
        }
        self.data
            .read()
            .map_err(|e| QueryError::DataUnavailable(e.to_string()))
    }
}

fn sessions_in<'a>(
    data: &'a EventSnapshot,
    game: Option<GameId>,
    window: TimeWindow,
) -> impl Iterator<Item = &'a SessionEvent> {
    data.sessions
        .iter()
        .filter(move |s| game.is_none_or(|g| s.game_id == g) && window.contains(s.start_time))
}

fn scores_in(
    data: &EventSnapshot,
    game: GameId,
    window: TimeWindow,
) -> impl Iterator<Item = &ScoreEvent> {
    data.scores
        .iter()
        .filter(move |s| s.game_id == game && window.contains(s.timestamp))
}

#[async_trait]
impl EventQueryProvider for InMemoryEventStore {
    async fn list_games(&self) -> Result<Vec<Game>, QueryError> {
        let mut games = self.read()?.games.clone();
        games.sort_by_key(|g| g.id);
        Ok(games)
    }

    async fn count_scores(&self, game: GameId, window: TimeWindow) -> Result<u64, QueryError> {
        let data = self.read()?;
        Ok(scores_in(&data, game, window).count() as u64)
    }

    async fn count_distinct_participants(
        &self,
        game: GameId,
        source: EventSource,
        window: TimeWindow,
    ) -> Result<u64, QueryError> {
        let data = self.read()?;
        let players: HashSet<ContestantId> = match source {
            EventSource::Scores => scores_in(&data, game, window).map(|s| s.contestant_id).collect(),
            EventSource::Sessions => sessions_in(&data, Some(game), window)
                .map(|s| s.contestant_id)
                .collect(),
        };
        Ok(players.len() as u64)
    }

    async fn count_sessions(&self, game: GameId, window: TimeWindow) -> Result<u64, QueryError> {
        let data = self.read()?;
        Ok(sessions_in(&data, Some(game), window).count() as u64)
    }

    async fn count_active_sessions(&self, game: GameId, at: DateTime<Utc>) -> Result<u64, QueryError> {
        let data = self.read()?;
        Ok(data
            .sessions
            .iter()
            .filter(|s| s.game_id == game && s.is_open_at(at))
            .count() as u64)
    }

    async fn max_session_length(
        &self,
        game: GameId,
        window: TimeWindow,
    ) -> Result<Option<u32>, QueryError> {
        let data = self.read()?;
        Ok(sessions_in(&data, Some(game), window)
            .filter_map(|s| s.session_length)
            .max())
    }

    async fn count_upvotes(&self, game: GameId, window: TimeWindow) -> Result<u64, QueryError> {
        let data = self.read()?;
        Ok(data
            .upvotes
            .iter()
            .filter(|u| u.game_id == game && window.contains(u.timestamp))
            .count() as u64)
    }

    async fn last_event_time(
        &self,
        game: GameId,
        window: TimeWindow,
    ) -> Result<Option<DateTime<Utc>>, QueryError> {
        let data = self.read()?;
        Ok(scores_in(&data, game, window).map(|s| s.timestamp).max())
    }

    async fn fleet_max(&self, metric: FleetMetric, window: TimeWindow) -> Result<Option<u64>, QueryError> {
        let data = self.read()?;
        let max = match metric {
            FleetMetric::DailyPlayers => {
                let mut per_day: HashMap<(GameId, NaiveDate), HashSet<ContestantId>> = HashMap::new();
                for s in sessions_in(&data, None, window) {
                    per_day
                        .entry((s.game_id, s.start_time.date_naive()))
                        .or_default()
                        .insert(s.contestant_id);
                }
                per_day.values().map(|players| players.len() as u64).max()
            }
            FleetMetric::DailySessions => {
                let mut per_day: HashMap<(GameId, NaiveDate), u64> = HashMap::new();
                for s in sessions_in(&data, None, window) {
                    *per_day.entry((s.game_id, s.start_time.date_naive())).or_default() += 1;
                }
                per_day.into_values().max()
            }
            FleetMetric::Upvotes => {
                let mut per_game: HashMap<GameId, u64> = HashMap::new();
                for u in data.upvotes.iter().filter(|u| window.contains(u.timestamp)) {
                    *per_game.entry(u.game_id).or_default() += 1;
                }
                per_game.into_values().max()
            }
            FleetMetric::SessionLength => sessions_in(&data, None, window)
                .filter_map(|s| s.session_length)
                .max()
                .map(u64::from),
            FleetMetric::OpenSessions { at } => {
                let mut per_game: HashMap<GameId, u64> = HashMap::new();
                for s in sessions_in(&data, None, window).filter(|s| s.is_open_at(at)) {
                    *per_game.entry(s.game_id).or_default() += 1;
                }
                per_game.into_values().max()
            }
        };
        Ok(max)
    }

    async fn top_scores(&self, filter: LeaderboardFilter) -> Result<Vec<LeaderboardEntry>, QueryError> {
        let data = self.read()?;
        let game_names: HashMap<GameId, &str> =
            data.games.iter().map(|g| (g.id, g.name.as_str())).collect();
        let contestant_names: HashMap<ContestantId, &str> = data
            .contestants
            .iter()
            .map(|c| (c.id, c.name.as_str()))
            .collect();

        let mut entries: Vec<LeaderboardEntry> = data
            .scores
            .iter()
            .filter(|s| filter.game.is_none_or(|g| s.game_id == g))
            .filter(|s| filter.window.is_none_or(|w| w.contains(s.timestamp)))
            .filter_map(|s| {
                Some(LeaderboardEntry {
                    contestant_name: contestant_names.get(&s.contestant_id)?.to_string(),
                    game_name: game_names.get(&s.game_id)?.to_string(),
                    score: s.value,
                    timestamp: s.timestamp,
                })
            })
            .collect();

        entries.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.timestamp.cmp(&b.timestamp))
        });
        Ok(entries)
    }
}
