use crate::error::EngineError;
use chrono::{DateTime, Utc};
use configuration::ScoringConfig;
use core_types::{Game, ScoreRecord, StrategyId};
use events::EventQueryProvider;
use ranker::Ranker;
use std::sync::Arc;
use std::time::Instant;
use strategies::{create_strategy, ScoreStrategy};

pub mod error;

/// The central orchestrator: lists games, scores them with one strategy and ranks the result.
///
/// The engine holds no mutable state, so a single instance can serve
/// concurrent requests. Every request is all-or-nothing: if any query fails
/// the caller receives the error and no partial ranking.
pub struct PopularityEngine {
    provider: Arc<dyn EventQueryProvider>,
    strategy: Box<dyn ScoreStrategy>,
    ranker: Ranker,
}

impl PopularityEngine {
    pub fn new(provider: Arc<dyn EventQueryProvider>, strategy: Box<dyn ScoreStrategy>) -> Self {
        Self {
            provider,
            strategy,
            ranker: Ranker::new(),
        }
    }

    /// Builds the engine with the strategy selected by `id`, validating its parameters.
    pub fn from_config(
        provider: Arc<dyn EventQueryProvider>,
        id: StrategyId,
        config: &ScoringConfig,
    ) -> Result<Self, EngineError> {
        let strategy = create_strategy(id, config)?;
        Ok(Self::new(provider, strategy))
    }

    pub fn strategy_id(&self) -> StrategyId {
        self.strategy.id()
    }

    /// Scores and ranks every game the provider knows about.
    pub async fn rank(&self, reference_time: DateTime<Utc>) -> Result<Vec<ScoreRecord>, EngineError> {
        let games = self.provider.list_games().await?;
        self.rank_games(&games, reference_time).await
    }

    /// Scores and ranks a caller-supplied set of games.
    pub async fn rank_games(
        &self,
        games: &[Game],
        reference_time: DateTime<Utc>,
    ) -> Result<Vec<ScoreRecord>, EngineError> {
        let started = Instant::now();
        let strategy = self.strategy.id();

        let records = match self
            .strategy
            .score(self.provider.as_ref(), games, reference_time)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(%strategy, error = %e, "Scoring request aborted");
                return Err(e.into());
            }
        };
        let ranked = self.ranker.rank_owned(records);

        tracing::info!(
            %strategy,
            games = ranked.len(),
            reference_time = %reference_time.to_rfc3339(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Popularity ranking complete"
        );
        Ok(ranked)
    }
}
