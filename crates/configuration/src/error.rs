use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Invalid [logging] section: {0}")]
    InvalidLogging(String),

    #[error("Invalid [scoring] section: {0}")]
    InvalidScoring(String),
}
