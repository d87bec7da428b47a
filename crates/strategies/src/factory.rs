use crate::error::StrategyError;
use crate::fleet::FleetNormalizedScore;
use crate::trend::TrendScore;
use crate::ScoreStrategy;
use configuration::ScoringConfig;
use core_types::StrategyId;

/// Creates a new strategy instance based on the provided ID and configuration.
///
/// Parameter validation happens here, once, so a misconfigured weight set is
/// rejected before any scoring request is served.
pub fn create_strategy(
    id: StrategyId,
    config: &ScoringConfig,
) -> Result<Box<dyn ScoreStrategy>, StrategyError> {
    // The compiler will error if a new StrategyId is added but not handled here.
    let limit = config.max_concurrent_games;
    match id {
        StrategyId::Trend => Ok(Box::new(
            TrendScore::new(config.trend.clone())?.with_max_concurrent_games(limit)?,
        )),
        StrategyId::FleetNormalized => Ok(Box::new(
            FleetNormalizedScore::new(config.fleet_weights.clone())?
                .with_max_concurrent_games(limit)?,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn builds_each_strategy_from_defaults() {
        let config = ScoringConfig::default();
        for id in [StrategyId::Trend, StrategyId::FleetNormalized] {
            let strategy = create_strategy(id, &config).unwrap();
            assert_eq!(strategy.id(), id);
        }
    }

    #[test]
    fn invalid_weights_fail_at_construction() {
        let mut config = ScoringConfig::default();
        config.fleet_weights.upvotes = Decimal::ZERO;
        assert!(matches!(
            create_strategy(StrategyId::FleetNormalized, &config),
            Err(StrategyError::Configuration(_))
        ));
        // The trend strategy does not read fleet weights.
        assert!(create_strategy(StrategyId::Trend, &config).is_ok());
    }

    #[test]
    fn zero_concurrency_fails_at_construction() {
        let config = ScoringConfig {
            max_concurrent_games: 0,
            ..ScoringConfig::default()
        };
        for id in [StrategyId::Trend, StrategyId::FleetNormalized] {
            assert!(matches!(
                create_strategy(id, &config),
                Err(StrategyError::Configuration(_))
            ));
        }
    }
}
