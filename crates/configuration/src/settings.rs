use core_types::StrategyId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Contains parameters for both popularity strategies.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// The strategy used when the caller does not pick one.
    #[serde(default = "default_strategy")]
    pub default_strategy: StrategyId,
    #[serde(default)]
    pub fleet_weights: FleetWeights,
    #[serde(default)]
    pub trend: TrendParams,
    /// How many games are scored at once. Each game issues up to five queries
    /// concurrently, so keep `5 × this` at or below the database pool size.
    #[serde(default = "default_max_concurrent_games")]
    pub max_concurrent_games: usize,
}

fn default_strategy() -> StrategyId {
    StrategyId::FleetNormalized
}

fn default_max_concurrent_games() -> usize {
    2
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            default_strategy: default_strategy(),
            fleet_weights: FleetWeights::default(),
            trend: TrendParams::default(),
            max_concurrent_games: default_max_concurrent_games(),
        }
    }
}

/// Weights for the five fleet-normalized factors. Must be non-negative and sum to 1.0.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FleetWeights {
    /// Distinct players yesterday vs. the fleet's best day.
    pub daily_players: Decimal,
    /// Sessions open now vs. the fleet's busiest game right now.
    pub current_players: Decimal,
    /// Total upvotes vs. the most upvoted game.
    pub upvotes: Decimal,
    /// Longest session yesterday vs. the longest session ever recorded.
    pub session_length: Decimal,
    /// Sessions yesterday vs. the fleet's busiest day.
    pub daily_sessions: Decimal,
}

impl FleetWeights {
    pub fn sum(&self) -> Decimal {
        self.as_array().iter().sum()
    }

    pub fn as_array(&self) -> [Decimal; 5] {
        [
            self.daily_players,
            self.current_players,
            self.upvotes,
            self.session_length,
            self.daily_sessions,
        ]
    }
}

impl Default for FleetWeights {
    fn default() -> Self {
        Self {
            daily_players: dec!(0.30),
            current_players: dec!(0.20),
            upvotes: dec!(0.25),
            session_length: dec!(0.15),
            daily_sessions: dec!(0.10),
        }
    }
}

/// Parameters for the recency/trend-weighted strategy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrendParams {
    /// Length of the "recent" window, and the recency cut-off for the last event.
    pub recent_days: u32,
    /// Length of the full comparison window; the prior period is `[history, recent)`.
    pub history_days: u32,
    pub recent_weight: Decimal,
    pub total_weight: Decimal,
    /// Points awarded per unique player.
    pub player_multiplier: Decimal,
    pub divisor: Decimal,
    /// Multiplier applied to activity when the last event is older than `recent_days`.
    pub stale_recency_weight: Decimal,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            recent_days: 7,
            history_days: 30,
            recent_weight: dec!(0.7),
            total_weight: dec!(0.3),
            player_multiplier: dec!(2),
            divisor: dec!(3),
            stale_recency_weight: dec!(0.5),
        }
    }
}

/// Logging output configuration consumed by the binary at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive used when `RUST_LOG` is not set.
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            format: LogFormat::Full,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Full,
    Compact,
}
