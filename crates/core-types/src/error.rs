use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Invalid time window: start {start} is after end {end}")]
    InvertedWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid time window: {0}")]
    MalformedWindow(String),
}

impl CoreError {
    /// Returns true for the window-shaped variants, which callers surface as `InvalidWindow`.
    pub fn is_window_error(&self) -> bool {
        matches!(self, CoreError::InvertedWindow { .. } | CoreError::MalformedWindow(_))
    }
}
