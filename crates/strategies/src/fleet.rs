use crate::error::StrategyError;
use crate::fanout::{check_limit, score_each, DEFAULT_MAX_CONCURRENT_GAMES};
use crate::ratio::normalized;
use crate::ScoreStrategy;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use configuration::FleetWeights;
use core_types::{EventSource, Game, ScoreRecord, StrategyId, TimeWindow};
use events::{EventQueryProvider, FleetMetric};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Weights may drift from 1.0 by at most this much after being parsed from text.
const WEIGHT_SUM_TOLERANCE: Decimal = dec!(0.000001);

const HUNDRED: Decimal = dec!(100);

/// The five-factor popularity strategy, normalized against fleet-wide maxima.
///
/// Each factor compares one game's value to the best value any game in the
/// fleet has achieved for that metric, so every ratio lies in `[0, 1]` and the
/// weighted sum (×100) lies in `[0, 100]`.
#[derive(Debug, Clone)]
pub struct FleetNormalizedScore {
    weights: FleetWeights,
    max_concurrent_games: usize,
}

/// The fleet-wide denominators, collected once per scoring request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FleetMaxima {
    pub daily_players: u64,
    pub concurrent_players: u64,
    pub upvotes: u64,
    pub session_length: u64,
    pub daily_sessions: u64,
}

impl FleetMaxima {
    /// Runs the fleet-wide aggregation pass: exactly one `fleet_max` query per metric.
    pub async fn collect(
        provider: &dyn EventQueryProvider,
        now: DateTime<Utc>,
    ) -> Result<Self, StrategyError> {
        let history = TimeWindow::until(now);
        let concurrent = FleetMetric::OpenSessions { at: now };

        let (daily_players, concurrent_players, upvotes, session_length, daily_sessions) = futures::try_join!(
            provider.fleet_max(FleetMetric::DailyPlayers, history),
            provider.fleet_max(concurrent, TimeWindow::unbounded()),
            provider.fleet_max(FleetMetric::Upvotes, history),
            provider.fleet_max(FleetMetric::SessionLength, history),
            provider.fleet_max(FleetMetric::DailySessions, history),
        )?;

        Ok(Self {
            daily_players: or_one(FleetMetric::DailyPlayers, daily_players),
            concurrent_players: or_one(concurrent, concurrent_players),
            upvotes: or_one(FleetMetric::Upvotes, upvotes),
            session_length: or_one(FleetMetric::SessionLength, session_length),
            daily_sessions: or_one(FleetMetric::DailySessions, daily_sessions),
        })
    }
}

/// A fleet maximum with no data (or a zero maximum) is treated as 1.
fn or_one(metric: FleetMetric, observed: Option<u64>) -> u64 {
    match observed {
        Some(max) if max > 0 => max,
        _ => {
            tracing::debug!(metric = metric.name(), "No fleet data, defaulting maximum to 1");
            1
        }
    }
}

/// Raw per-game inputs to the fleet-normalized formula.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetInputs {
    pub yesterday_players: u64,
    pub current_players: u64,
    pub total_upvotes: u64,
    pub max_session_length_yesterday: u64,
    pub sessions_yesterday: u64,
}

/// The formula's result for one game, on the 0–100 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FleetBreakdown {
    pub daily_players_score: Decimal,
    pub current_players_score: Decimal,
    pub upvotes_score: Decimal,
    pub session_length_score: Decimal,
    pub daily_sessions_score: Decimal,
    pub popularity_score: Decimal,
}

impl FleetNormalizedScore {
    /// Creates a new `FleetNormalizedScore`, rejecting negative weights or weights
    /// that do not sum to 1.0.
    pub fn new(weights: FleetWeights) -> Result<Self, StrategyError> {
        if let Some(negative) = weights.as_array().into_iter().find(|w| *w < Decimal::ZERO) {
            return Err(StrategyError::Configuration(format!(
                "fleet weights must not be negative (got {negative})"
            )));
        }
        let sum = weights.sum();
        if (sum - Decimal::ONE).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(StrategyError::Configuration(format!(
                "fleet weights must sum to 1.0 (got {sum})"
            )));
        }
        Ok(Self {
            weights,
            max_concurrent_games: DEFAULT_MAX_CONCURRENT_GAMES,
        })
    }

    /// Caps how many games are scored concurrently in the per-game pass.
    pub fn with_max_concurrent_games(mut self, limit: usize) -> Result<Self, StrategyError> {
        self.max_concurrent_games = check_limit(limit)?;
        Ok(self)
    }

    /// Applies the weighted, normalized formula to already-fetched inputs.
    pub fn compute(&self, inputs: &FleetInputs, maxima: &FleetMaxima) -> FleetBreakdown {
        let w = &self.weights;
        let term = |weight: Decimal, value: u64, max: u64| {
            weight * normalized(Decimal::from(value), Decimal::from(max))
        };

        let w1 = term(w.daily_players, inputs.yesterday_players, maxima.daily_players);
        let w2 = term(w.current_players, inputs.current_players, maxima.concurrent_players);
        let w3 = term(w.upvotes, inputs.total_upvotes, maxima.upvotes);
        let w4 = term(
            w.session_length,
            inputs.max_session_length_yesterday,
            maxima.session_length,
        );
        let w5 = term(w.daily_sessions, inputs.sessions_yesterday, maxima.daily_sessions);

        let percent = |x: Decimal| (x * HUNDRED).round_dp(2);
        FleetBreakdown {
            daily_players_score: percent(w1),
            current_players_score: percent(w2),
            upvotes_score: percent(w3),
            session_length_score: percent(w4),
            daily_sessions_score: percent(w5),
            popularity_score: percent(w1 + w2 + w3 + w4 + w5),
        }
    }

    async fn fetch_inputs(
        &self,
        provider: &dyn EventQueryProvider,
        game: &Game,
        now: DateTime<Utc>,
        yesterday: TimeWindow,
    ) -> Result<FleetInputs, StrategyError> {
        let (yesterday_players, current_players, total_upvotes, longest, sessions_yesterday) = futures::try_join!(
            provider.count_distinct_participants(game.id, EventSource::Sessions, yesterday),
            provider.count_active_sessions(game.id, now),
            provider.count_upvotes(game.id, TimeWindow::until(now)),
            provider.max_session_length(game.id, yesterday),
            provider.count_sessions(game.id, yesterday),
        )?;

        Ok(FleetInputs {
            yesterday_players,
            current_players,
            total_upvotes,
            max_session_length_yesterday: longest.map_or(0, u64::from),
            sessions_yesterday,
        })
    }

    async fn score_game(
        &self,
        provider: &dyn EventQueryProvider,
        game: &Game,
        now: DateTime<Utc>,
        yesterday: TimeWindow,
        maxima: &FleetMaxima,
    ) -> Result<ScoreRecord, StrategyError> {
        let inputs = self.fetch_inputs(provider, game, now, yesterday).await?;
        let b = self.compute(&inputs, maxima);

        tracing::debug!(game_id = %game.id, score = %b.popularity_score, ?inputs, "Fleet score computed");

        Ok(
            ScoreRecord::for_game(game, StrategyId::FleetNormalized, b.popularity_score)
                .with_component("daily_players_score", b.daily_players_score)
                .with_component("current_players_score", b.current_players_score)
                .with_component("upvotes_score", b.upvotes_score)
                .with_component("session_length_score", b.session_length_score)
                .with_component("daily_sessions_score", b.daily_sessions_score)
                .with_metric("yesterday_players", inputs.yesterday_players)
                .with_metric("current_players", inputs.current_players)
                .with_metric("total_upvotes", inputs.total_upvotes)
                .with_metric(
                    "max_session_length_yesterday",
                    inputs.max_session_length_yesterday,
                )
                .with_metric("total_sessions_yesterday", inputs.sessions_yesterday),
        )
    }
}

#[async_trait]
impl ScoreStrategy for FleetNormalizedScore {
    fn id(&self) -> StrategyId {
        StrategyId::FleetNormalized
    }

    async fn score(
        &self,
        provider: &dyn EventQueryProvider,
        games: &[Game],
        reference_time: DateTime<Utc>,
    ) -> Result<Vec<ScoreRecord>, StrategyError> {
        let yesterday = TimeWindow::yesterday(reference_time)?;

        // Pass 1: fleet-wide maxima, shared by every game below.
        let maxima = FleetMaxima::collect(provider, reference_time).await?;
        tracing::debug!(?maxima, window = %yesterday, "Fleet maxima collected");

        // Pass 2: per-game lookups only.
        let maxima = &maxima;
        score_each(games, self.max_concurrent_games, |game| {
            self.score_game(provider, game, reference_time, yesterday, maxima)
        })
        .await
    }
}
