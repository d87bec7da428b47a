use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Identity of a rankable game. Also the deterministic tie-break key when ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub i64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContestantId(pub i64);

/// A game as owned by the record store. The engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    /// Gates whether new score events may be recorded against this game.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contestant {
    pub id: ContestantId,
    pub name: String,
}

/// A completed score submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEvent {
    pub game_id: GameId,
    pub contestant_id: ContestantId,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// A play session. `end_time == None` means the session is still open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub game_id: GameId,
    pub contestant_id: ContestantId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Whole minutes, populated when the session is closed.
    pub session_length: Option<u32>,
}

impl SessionEvent {
    pub fn open(game_id: GameId, contestant_id: ContestantId, start_time: DateTime<Utc>) -> Self {
        Self {
            game_id,
            contestant_id,
            start_time,
            end_time: None,
            session_length: None,
        }
    }

    /// Closes the session at `end`, deriving the length in minutes rounded to the nearest minute.
    pub fn close(&mut self, end: DateTime<Utc>) -> Result<(), CoreError> {
        if end < self.start_time {
            return Err(CoreError::InvalidInput(
                "end_time".to_string(),
                format!("{end} is before session start {}", self.start_time),
            ));
        }
        let seconds = (end - self.start_time).num_seconds();
        let minutes = u32::try_from((seconds + 30) / 60).map_err(|_| {
            CoreError::InvalidInput(
                "end_time".to_string(),
                format!("session of {seconds}s exceeds the representable length"),
            )
        })?;
        self.end_time = Some(end);
        self.session_length = Some(minutes);
        Ok(())
    }

    /// A session is open at `at` when it started at or before `at` and has not ended before it.
    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        self.start_time <= at && self.end_time.is_none_or(|end| end >= at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpvoteEvent {
    pub game_id: GameId,
    pub contestant_id: ContestantId,
    pub timestamp: DateTime<Utc>,
}

/// A single row of the score leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub contestant_name: String,
    pub game_name: String,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn close_rounds_to_nearest_minute() {
        let mut session = SessionEvent::open(GameId(1), ContestantId(7), start());
        session.close(start() + Duration::seconds(29 * 60 + 31)).unwrap();
        assert_eq!(session.session_length, Some(30));

        let mut short = SessionEvent::open(GameId(1), ContestantId(7), start());
        short.close(start() + Duration::seconds(89)).unwrap();
        assert_eq!(short.session_length, Some(1));
    }

    #[test]
    fn close_before_start_is_rejected() {
        let mut session = SessionEvent::open(GameId(1), ContestantId(7), start());
        let err = session.close(start() - Duration::minutes(1)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(field, _) if field == "end_time"));
        assert!(session.end_time.is_none());
        assert!(session.session_length.is_none());
    }

    #[test]
    fn open_at_includes_both_boundaries() {
        let mut session = SessionEvent::open(GameId(1), ContestantId(7), start());
        assert!(!session.is_open_at(start() - Duration::seconds(1)));
        assert!(session.is_open_at(start()));
        assert!(session.is_open_at(start() + Duration::days(3)));

        session.close(start() + Duration::minutes(10)).unwrap();
        assert!(session.is_open_at(start() + Duration::minutes(10)));
        assert!(!session.is_open_at(start() + Duration::minutes(11)));
    }
}
