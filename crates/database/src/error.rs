use core_types::GameId;
use events::QueryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Database query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Game {0} does not exist")]
    UnknownGame(GameId),

    #[error("Game {0} is not active")]
    GameInactive(GameId),
}

impl From<DbError> for QueryError {
    fn from(err: DbError) -> Self {
        QueryError::DataUnavailable(err.to_string())
    }
}
