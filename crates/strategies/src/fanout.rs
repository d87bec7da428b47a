use crate::error::StrategyError;
use core_types::{Game, ScoreRecord};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;

/// Games scored at once unless configured otherwise.
pub(crate) const DEFAULT_MAX_CONCURRENT_GAMES: usize = 2;

pub(crate) fn check_limit(limit: usize) -> Result<usize, StrategyError> {
    if limit == 0 {
        return Err(StrategyError::Configuration(
            "max_concurrent_games must be at least 1".to_string(),
        ));
    }
    Ok(limit)
}

/// Scores `games` with at most `limit` of them in flight, returning records in
/// input order. The first failure cancels the rest.
pub(crate) fn score_each<'a, F, Fut>(
    games: &'a [Game],
    limit: usize,
    score: F,
) -> BoxFuture<'a, Result<Vec<ScoreRecord>, StrategyError>>
where
    F: FnMut(&'a Game) -> Fut + Send + 'a,
    Fut: Future<Output = Result<ScoreRecord, StrategyError>> + Send + 'a,
{
    // Boxing erases the combinator type so callers inside `#[async_trait]`
    // methods don't trip rustc's higher-ranked `Send` inference (rust#102211).
    stream::iter(games)
        .map(score)
        .buffered(limit.max(1))
        .try_collect()
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use core_types::{GameId, StrategyId};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn games(n: i64) -> Vec<Game> {
        (1..=n)
            .map(|i| Game {
                id: GameId(i),
                name: format!("g{i}"),
                is_active: true,
                created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            })
            .collect()
    }

    #[tokio::test]
    async fn keeps_input_order_and_respects_the_limit() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let games = games(9);

        let records = score_each(&games, 3, |game| {
            let (in_flight, peak) = (&in_flight, &peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                // Later games finish first; output must still follow input order.
                for _ in 0..(10 - game.id.0) {
                    tokio::task::yield_now().await;
                }
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(ScoreRecord::for_game(game, StrategyId::Trend, Decimal::ZERO))
            }
        })
        .await
        .unwrap();

        let ids: Vec<i64> = records.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, (1..=9).collect::<Vec<_>>());
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn first_failure_aborts_the_batch() {
        let games = games(4);
        let result = score_each(&games, 2, |game| async move {
            if game.id == GameId(3) {
                Err(StrategyError::Configuration("boom".to_string()))
            } else {
                Ok(ScoreRecord::for_game(game, StrategyId::Trend, Decimal::ZERO))
            }
        })
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert!(matches!(check_limit(0), Err(StrategyError::Configuration(_))));
        assert_eq!(check_limit(5).unwrap(), 5);
    }
}
