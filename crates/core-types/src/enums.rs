use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Identifies one of the popularity scoring strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    /// Recent-versus-historical activity volume weighted by recency.
    Trend,
    /// Five-factor weighted sum normalized against fleet-wide maxima.
    FleetNormalized,
}

impl StrategyId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::Trend => "trend",
            StrategyId::FleetNormalized => "fleet_normalized",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trend" => Ok(StrategyId::Trend),
            "fleet" | "fleet_normalized" | "fleet-normalized" => Ok(StrategyId::FleetNormalized),
            other => Err(CoreError::InvalidInput(
                "strategy".to_string(),
                format!("unknown strategy '{other}'"),
            )),
        }
    }
}

/// Which event stream a participant count is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    Scores,
    Sessions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strategy_aliases() {
        assert_eq!("trend".parse::<StrategyId>().unwrap(), StrategyId::Trend);
        assert_eq!("Fleet".parse::<StrategyId>().unwrap(), StrategyId::FleetNormalized);
        assert_eq!(
            "fleet-normalized".parse::<StrategyId>().unwrap(),
            StrategyId::FleetNormalized
        );
        assert!("elo".parse::<StrategyId>().is_err());
    }

    #[test]
    fn display_matches_serde_name() {
        let json = serde_json::to_string(&StrategyId::FleetNormalized).unwrap();
        assert_eq!(json, format!("\"{}\"", StrategyId::FleetNormalized));
    }
}
