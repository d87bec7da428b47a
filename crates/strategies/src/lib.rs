//! # Pulse Strategy Library
//!
//! This crate contains the popularity scoring logic. It defines a universal
//! `ScoreStrategy` trait and provides the two concrete implementations.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** Strategies have no knowledge of databases. Every input is
//!   read through an `EventQueryProvider`, and every output is a `ScoreRecord`.
//! - **Strategy Agnostic Engine:** By using the `ScoreStrategy` trait, the engine
//!   can rank games with either formula without knowing its internal details.
//! - **Explicit Time:** Every call takes its reference time as a parameter;
//!   nothing reads the wall clock.
//!
//! ## Public API
//!
//! - `ScoreStrategy`: The core trait all strategies implement.
//! - `create_strategy`: The factory function to construct a strategy instance.
//! - `TrendScore` and `FleetNormalizedScore`: the concrete strategies.
//! - `safe_ratio`: the single division helper both strategies share.

pub mod error;
pub mod factory;
mod fanout;
pub mod fleet;
pub mod ratio;
pub mod trend;

// Re-export the key components to create a clean, public-facing API.
pub use error::StrategyError;
pub use factory::create_strategy;
pub use fleet::{FleetBreakdown, FleetInputs, FleetMaxima, FleetNormalizedScore};
pub use ratio::{normalized, safe_ratio};
pub use trend::{TrendBreakdown, TrendInputs, TrendScore};

pub use core_types::StrategyId;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{Game, ScoreRecord};
use events::EventQueryProvider;

/// The core trait that all popularity strategies must implement.
///
/// Implementations are stateless and reentrant: the same instance may score
/// many requests concurrently. The `Send + Sync` bounds allow a boxed strategy
/// to be shared across tasks.
#[async_trait]
pub trait ScoreStrategy: Send + Sync {
    fn id(&self) -> StrategyId;

    /// Scores every game in `games` as of `reference_time`.
    ///
    /// # Returns
    ///
    /// * `Ok(records)` - one record per input game, in input order (unranked).
    /// * `Err(StrategyError)` - if any required query fails; no partial results are returned.
    async fn score(
        &self,
        provider: &dyn EventQueryProvider,
        games: &[Game],
        reference_time: DateTime<Utc>,
    ) -> Result<Vec<ScoreRecord>, StrategyError>;
}
