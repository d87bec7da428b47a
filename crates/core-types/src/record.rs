use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::enums::StrategyId;
use crate::structs::{Game, GameId};

/// A raw metric value reported alongside a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(u64),
    Ratio(Decimal),
    Timestamp(DateTime<Utc>),
    Missing,
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        MetricValue::Count(value)
    }
}

impl From<Decimal> for MetricValue {
    fn from(value: Decimal) -> Self {
        MetricValue::Ratio(value)
    }
}

impl<T: Into<MetricValue>> From<Option<T>> for MetricValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(MetricValue::Missing, Into::into)
    }
}

impl From<DateTime<Utc>> for MetricValue {
    fn from(value: DateTime<Utc>) -> Self {
        MetricValue::Timestamp(value)
    }
}

/// The engine's per-game output. Ephemeral: built fresh for every scoring request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub id: GameId,
    pub name: String,
    pub strategy: StrategyId,
    pub popularity_score: Decimal,
    /// Named contribution of each scoring factor.
    pub components: BTreeMap<String, Decimal>,
    /// Raw inputs used to compute the score.
    pub metrics: BTreeMap<String, MetricValue>,
    pub is_active: bool,
}

impl ScoreRecord {
    /// Starts a record for `game` with an empty breakdown.
    pub fn for_game(game: &Game, strategy: StrategyId, popularity_score: Decimal) -> Self {
        Self {
            id: game.id,
            name: game.name.clone(),
            strategy,
            popularity_score,
            components: BTreeMap::new(),
            metrics: BTreeMap::new(),
            is_active: game.is_active,
        }
    }

    pub fn with_component(mut self, name: &str, value: Decimal) -> Self {
        self.components.insert(name.to_string(), value);
        self
    }

    pub fn with_metric(mut self, name: &str, value: impl Into<MetricValue>) -> Self {
        self.metrics.insert(name.to_string(), value.into());
        self
    }

    pub fn component(&self, name: &str) -> Option<Decimal> {
        self.components.get(name).copied()
    }

    pub fn metric(&self, name: &str) -> Option<&MetricValue> {
        self.metrics.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn serializes_to_plain_numbers_and_nulls() {
        let game = Game {
            id: GameId(3),
            name: "Snake".to_string(),
            is_active: false,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        let record = ScoreRecord::for_game(&game, StrategyId::Trend, dec!(12.5))
            .with_component("player_score", dec!(4))
            .with_metric("total_scores", 9_u64)
            .with_metric("last_played", None::<DateTime<Utc>>);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["popularity_score"], 12.5);
        assert_eq!(json["components"]["player_score"], 4.0);
        assert_eq!(json["metrics"]["total_scores"], 9);
        assert!(json["metrics"]["last_played"].is_null());
        assert_eq!(json["is_active"], false);
    }
}
