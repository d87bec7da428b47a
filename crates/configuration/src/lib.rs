use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{Config, FleetWeights, LogFormat, LoggingConfig, ScoringConfig, TrendParams};

/// Environment variables override file values, e.g. `PULSE__SCORING__TREND__RECENT_DAYS=14`.
const ENV_PREFIX: &str = "PULSE";

/// Loads the application configuration from the `config.toml` file.
///
/// A missing file is not an error: every section falls back to its defaults.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from("config.toml")
}

/// Loads configuration from `path`, then layers `PULSE__*` environment variables on top.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    load_layers(path.as_ref(), environment())
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
}

fn load_layers(path: &Path, env: config::Environment) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(env)
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;

    tracing::debug!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.logging.level.trim().is_empty() {
        return Err(ConfigError::InvalidLogging(
            "level must not be empty".to_string(),
        ));
    }
    if config.scoring.max_concurrent_games == 0 {
        return Err(ConfigError::InvalidScoring(
            "max_concurrent_games must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::StrategyId;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.scoring.default_strategy, StrategyId::FleetNormalized);
        assert_eq!(config.scoring.fleet_weights, FleetWeights::default());
        assert_eq!(config.scoring.fleet_weights.sum(), dec!(1.00));
        assert_eq!(config.scoring.trend, TrendParams::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn file_overrides_individual_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[scoring]
default_strategy = "trend"

[scoring.trend]
recent_days = 14

[logging]
level = "debug"
format = "compact"
"#
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.scoring.default_strategy, StrategyId::Trend);
        assert_eq!(config.scoring.trend.recent_days, 14);
        assert_eq!(config.scoring.trend.history_days, 30);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn empty_log_level_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse.toml");
        std::fs::write(&path, "[logging]\nlevel = \"\"\n").unwrap();
        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::InvalidLogging(_))
        ));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse.toml");
        std::fs::write(&path, "[scoring]\nmax_concurrent_games = 0\n").unwrap();
        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::InvalidScoring(_))
        ));
    }

    #[test]
    fn environment_overrides_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse.toml");
        std::fs::write(&path, "[scoring.trend]\nrecent_days = 10\n").unwrap();

        // Injected rather than set on the process so parallel tests never see it.
        let vars = config::Map::from_iter([
            ("PULSE__SCORING__TREND__RECENT_DAYS".to_string(), "14".to_string()),
            ("PULSE__SCORING__FLEET_WEIGHTS__UPVOTES".to_string(), "0.35".to_string()),
            ("PULSE__SCORING__MAX_CONCURRENT_GAMES".to_string(), "4".to_string()),
            ("UNRELATED__SCORING__TREND__RECENT_DAYS".to_string(), "99".to_string()),
        ]);
        let config = load_layers(&path, environment().source(Some(vars))).unwrap();

        assert_eq!(config.scoring.trend.recent_days, 14);
        assert_eq!(config.scoring.fleet_weights.upvotes, dec!(0.35));
        assert_eq!(config.scoring.fleet_weights.daily_players, dec!(0.30));
        assert_eq!(config.scoring.max_concurrent_games, 4);
    }
}
