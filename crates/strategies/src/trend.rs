use crate::error::StrategyError;
use crate::fanout::{check_limit, score_each, DEFAULT_MAX_CONCURRENT_GAMES};
use crate::ratio::safe_ratio;
use crate::ScoreStrategy;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use configuration::TrendParams;
use core_types::{EventSource, Game, ScoreRecord, StrategyId, TimeWindow};
use events::EventQueryProvider;
use rust_decimal::Decimal;

/// The recency/trend-weighted popularity strategy.
///
/// Scores a game from its score-submission volume: recent activity counts more
/// than lifetime activity, games with nothing in the recent window are
/// discounted, and every unique player adds a fixed bonus.
#[derive(Debug, Clone)]
pub struct TrendScore {
    params: TrendParams,
    max_concurrent_games: usize,
}

/// Raw per-game inputs to the trend formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendInputs {
    pub total: u64,
    pub unique_players: u64,
    pub recent: u64,
    pub prior: u64,
    pub last_event: Option<DateTime<Utc>>,
}

/// The trend formula's result for one game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendBreakdown {
    pub recency_weight: Decimal,
    pub activity_score: Decimal,
    pub player_score: Decimal,
    pub popularity_score: Decimal,
    /// Signed relative change of recent vs. prior volume; zero without prior history.
    pub trend: Decimal,
}

impl TrendScore {
    /// Creates a new `TrendScore` instance with the given parameters.
    ///
    /// It performs validation to ensure the parameters are logical.
    pub fn new(params: TrendParams) -> Result<Self, StrategyError> {
        if params.recent_days == 0 {
            return Err(StrategyError::Configuration(
                "recent_days must be greater than 0".to_string(),
            ));
        }
        if params.history_days <= params.recent_days {
            return Err(StrategyError::Configuration(format!(
                "history_days ({}) must be greater than recent_days ({})",
                params.history_days, params.recent_days
            )));
        }
        let weights = [
            ("recent_weight", params.recent_weight),
            ("total_weight", params.total_weight),
            ("player_multiplier", params.player_multiplier),
            ("stale_recency_weight", params.stale_recency_weight),
        ];
        if let Some((name, value)) = weights.iter().find(|(_, v)| *v < Decimal::ZERO) {
            return Err(StrategyError::Configuration(format!(
                "{name} must not be negative (got {value})"
            )));
        }
        if params.divisor <= Decimal::ZERO {
            return Err(StrategyError::Configuration(
                "divisor must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            params,
            max_concurrent_games: DEFAULT_MAX_CONCURRENT_GAMES,
        })
    }

    /// Caps how many games are scored concurrently.
    pub fn with_max_concurrent_games(mut self, limit: usize) -> Result<Self, StrategyError> {
        self.max_concurrent_games = check_limit(limit)?;
        Ok(self)
    }

    /// Applies the trend formula to already-fetched inputs.
    pub fn compute(&self, inputs: &TrendInputs, now: DateTime<Utc>) -> TrendBreakdown {
        let p = &self.params;
        let total = Decimal::from(inputs.total);
        let recent = Decimal::from(inputs.recent);
        let prior = Decimal::from(inputs.prior);

        let trend = safe_ratio(recent - prior, prior, Decimal::ZERO);

        let is_recent = inputs
            .last_event
            .is_some_and(|last| now - last < Duration::days(i64::from(p.recent_days)));
        let recency_weight = if is_recent {
            Decimal::ONE
        } else {
            p.stale_recency_weight
        };

        let activity_score = (recent * p.recent_weight + total * p.total_weight) * recency_weight;
        let player_score = Decimal::from(inputs.unique_players) * p.player_multiplier;
        let popularity_score = safe_ratio(activity_score + player_score, p.divisor, Decimal::ZERO);

        TrendBreakdown {
            recency_weight,
            activity_score,
            player_score,
            popularity_score,
            trend,
        }
    }

    async fn fetch_inputs(
        &self,
        provider: &dyn EventQueryProvider,
        game: &Game,
        now: DateTime<Utc>,
    ) -> Result<TrendInputs, StrategyError> {
        let p = &self.params;
        let all_time = TimeWindow::until(now);
        let recent_window = TimeWindow::trailing_days(now, p.recent_days);
        let prior_window = TimeWindow::new(
            now - Duration::days(i64::from(p.history_days)),
            now - Duration::days(i64::from(p.recent_days)),
        )?;

        let (total, unique_players, recent, prior, last_event) = futures::try_join!(
            provider.count_scores(game.id, all_time),
            provider.count_distinct_participants(game.id, EventSource::Scores, all_time),
            provider.count_scores(game.id, recent_window),
            provider.count_scores(game.id, prior_window),
            provider.last_event_time(game.id, all_time),
        )?;

        Ok(TrendInputs {
            total,
            unique_players,
            recent,
            prior,
            last_event,
        })
    }

    async fn score_game(
        &self,
        provider: &dyn EventQueryProvider,
        game: &Game,
        now: DateTime<Utc>,
    ) -> Result<ScoreRecord, StrategyError> {
        let inputs = self.fetch_inputs(provider, game, now).await?;
        let breakdown = self.compute(&inputs, now);

        tracing::debug!(
            game_id = %game.id,
            total = inputs.total,
            recent = inputs.recent,
            prior = inputs.prior,
            score = %breakdown.popularity_score,
            "Trend score computed"
        );

        Ok(
            ScoreRecord::for_game(game, StrategyId::Trend, breakdown.popularity_score)
                .with_component("activity_score", breakdown.activity_score)
                .with_component("player_score", breakdown.player_score)
                .with_metric("total_scores", inputs.total)
                .with_metric("unique_players", inputs.unique_players)
                .with_metric("recent_scores", inputs.recent)
                .with_metric("prior_scores", inputs.prior)
                .with_metric("score_trend", breakdown.trend)
                .with_metric("recency_weight", breakdown.recency_weight)
                .with_metric("last_played", inputs.last_event),
        )
    }
}

#[async_trait]
impl ScoreStrategy for TrendScore {
    fn id(&self) -> StrategyId {
        StrategyId::Trend
    }

    async fn score(
        &self,
        provider: &dyn EventQueryProvider,
        games: &[Game],
        reference_time: DateTime<Utc>,
    ) -> Result<Vec<ScoreRecord>, StrategyError> {
        score_each(games, self.max_concurrent_games, |game| {
            self.score_game(provider, game, reference_time)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_types::{ContestantId, GameId, MetricValue, ScoreEvent};
    use events::InMemoryEventStore;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 18, 0, 0).unwrap()
    }

    fn strategy() -> TrendScore {
        TrendScore::new(TrendParams::default()).unwrap()
    }

    #[test]
    fn worked_example() {
        let inputs = TrendInputs {
            total: 50,
            unique_players: 10,
            recent: 20,
            prior: 10,
            last_event: Some(now() - Duration::days(2)),
        };
        let b = strategy().compute(&inputs, now());
        assert_eq!(b.recency_weight, Decimal::ONE);
        assert_eq!(b.trend, dec!(1));
        assert_eq!(b.activity_score, dec!(29));
        assert_eq!(b.player_score, dec!(20));
        assert_eq!(b.popularity_score.round_dp(2), dec!(16.33));
    }

    #[test]
    fn stale_and_silent_games_get_half_weight() {
        let mut inputs = TrendInputs {
            total: 10,
            unique_players: 1,
            recent: 0,
            prior: 0,
            last_event: Some(now() - Duration::days(7)),
        };
        let stale = strategy().compute(&inputs, now());
        assert_eq!(stale.recency_weight, dec!(0.5));
        assert_eq!(stale.activity_score, dec!(1.5));

        inputs.last_event = None;
        inputs.total = 0;
        inputs.unique_players = 0;
        let silent = strategy().compute(&inputs, now());
        assert_eq!(silent.recency_weight, dec!(0.5));
        assert_eq!(silent.popularity_score, Decimal::ZERO);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let mut params = TrendParams::default();
        params.history_days = 7;
        assert!(matches!(TrendScore::new(params), Err(StrategyError::Configuration(_))));

        let mut params = TrendParams::default();
        params.recent_weight = dec!(-0.1);
        assert!(matches!(TrendScore::new(params), Err(StrategyError::Configuration(_))));

        let mut params = TrendParams::default();
        params.divisor = Decimal::ZERO;
        assert!(matches!(TrendScore::new(params), Err(StrategyError::Configuration(_))));
    }

    #[tokio::test]
    async fn scores_games_from_provider_windows() {
        let store = InMemoryEventStore::new();
        store
            .add_game(Game {
                id: GameId(1),
                name: "Tetris".to_string(),
                is_active: true,
                created_at: now() - Duration::days(60),
            })
            .unwrap();
        let record = |player: i64, days_ago: i64| {
            store
                .record_score(ScoreEvent {
                    game_id: GameId(1),
                    contestant_id: ContestantId(player),
                    value: 1.0,
                    timestamp: now() - Duration::days(days_ago),
                })
                .unwrap();
        };
        // Two recent, one prior, one older than the history window, one in the future.
        record(1, 1);
        record(2, 3);
        record(1, 10);
        record(3, 45);
        record(4, -1);

        let games = store.list_games().await.unwrap();
        let records = strategy().score(&store, &games, now()).await.unwrap();
        let r = &records[0];

        assert_eq!(r.metric("total_scores"), Some(&MetricValue::Count(4)));
        assert_eq!(r.metric("unique_players"), Some(&MetricValue::Count(3)));
        assert_eq!(r.metric("recent_scores"), Some(&MetricValue::Count(2)));
        assert_eq!(r.metric("prior_scores"), Some(&MetricValue::Count(1)));
        assert_eq!(r.metric("score_trend"), Some(&MetricValue::Ratio(dec!(1))));
        // activity = 2*0.7 + 4*0.3 = 2.6; players = 6; (2.6 + 6) / 3
        assert_eq!(r.popularity_score, dec!(8.6) / dec!(3));
        assert!(r.is_active);
    }

    proptest! {
        #[test]
        fn no_prior_history_means_neutral_trend(recent in 0u64..10_000, total_extra in 0u64..10_000) {
            let inputs = TrendInputs {
                total: recent + total_extra,
                unique_players: 0,
                recent,
                prior: 0,
                last_event: Some(now()),
            };
            let b = strategy().compute(&inputs, now());
            prop_assert_eq!(b.trend, Decimal::ZERO);
            prop_assert!(b.popularity_score >= Decimal::ZERO);
        }
    }
}
