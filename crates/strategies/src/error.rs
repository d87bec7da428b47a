use core_types::CoreError;
use events::QueryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrategyError {
    /// A required aggregate query failed; the whole scoring batch is abandoned.
    #[error("Scoring aborted: {0}")]
    DataUnavailable(#[from] QueryError),

    #[error("Invalid time window: {0}")]
    InvalidWindow(CoreError),

    #[error("Strategy received invalid configuration: {0}")]
    Configuration(String),
}

impl From<CoreError> for StrategyError {
    fn from(err: CoreError) -> Self {
        if err.is_window_error() {
            StrategyError::InvalidWindow(err)
        } else {
            StrategyError::Configuration(err.to_string())
        }
    }
}
