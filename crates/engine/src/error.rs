use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Event query error: {0}")]
    Query(#[from] events::QueryError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] strategies::StrategyError),
}
