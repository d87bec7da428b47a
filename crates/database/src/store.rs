use crate::error::DbError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{EventSource, Game, GameId, LeaderboardEntry, ScoreEvent, TimeWindow};
use events::{EventQueryProvider, FleetMetric, Grouping, LeaderboardFilter, QueryError};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

/// The PostgreSQL event store. All aggregation happens in SQL; only scalars
/// (and leaderboard rows) cross the wire.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Creates a new `PgEventStore` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Flips a game's active flag and returns the updated row.
    ///
    /// Inactive games keep their history and are still scored; they only stop
    /// accepting new scores.
    pub async fn set_game_active(&self, game: GameId, is_active: bool) -> Result<Game, DbError> {
        let row = sqlx::query(
            r#"
            UPDATE games SET is_active = $2
            WHERE id = $1
            RETURNING id, name, is_active, created_at
            "#,
        )
        .bind(game.0)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?;

        let game = match row {
            Some(row) => game_from_row(&row)?,
            None => return Err(DbError::UnknownGame(game)),
        };
        tracing::info!(game_id = %game.id, is_active, "Game active flag updated");
        Ok(game)
    }

    /// Appends a score, refusing unknown and inactive games.
    ///
    /// The active check and the insert run as one statement, so a game ended
    /// concurrently can never receive a score after the flag flipped.
    pub async fn record_score(&self, score: &ScoreEvent) -> Result<(), DbError> {
        let is_active: Option<bool> = sqlx::query_scalar(RECORD_SCORE_SQL)
            .bind(score.game_id.0)
            .bind(score.contestant_id.0)
            .bind(score.value)
            .bind(score.timestamp)
            .fetch_optional(&self.pool)
            .await?;

        check_gate(score.game_id, is_active)?;
        tracing::debug!(game_id = %score.game_id, value = score.value, "Score recorded");
        Ok(())
    }

    async fn count(&self, sql: &str, game: GameId, window: TimeWindow) -> Result<u64, QueryError> {
        let n: i64 = sqlx::query_scalar(sql)
            .bind(game.0)
            .bind(window.start())
            .bind(window.end())
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(to_count(n))
    }
}

/// Inserts only when the target game exists and is active, and reports the
/// game's flag (no row when the game does not exist).
const RECORD_SCORE_SQL: &str = r#"
    WITH target AS (
        SELECT id, is_active FROM games WHERE id = $1
    ), inserted AS (
        INSERT INTO scores (game_id, contestant_id, score, "timestamp")
        SELECT id, $2, $3, $4 FROM target WHERE is_active
        RETURNING id
    )
    SELECT is_active FROM target
"#;

fn check_gate(game: GameId, is_active: Option<bool>) -> Result<(), DbError> {
    match is_active {
        None => Err(DbError::UnknownGame(game)),
        Some(false) => {
            tracing::warn!(game_id = %game, "Rejected score for inactive game");
            Err(DbError::GameInactive(game))
        }
        Some(true) => Ok(()),
    }
}

/// `col` restricted to the half-open window bound at `$first` and `$first + 1`.
/// A NULL bound leaves that side open.
fn window_clause(column: &str, first: usize) -> String {
    let second = first + 1;
    format!(
        "(${first}::TIMESTAMPTZ IS NULL OR {column} >= ${first}) \
         AND (${second}::TIMESTAMPTZ IS NULL OR {column} < ${second})"
    )
}

fn source_table(source: EventSource) -> (&'static str, &'static str) {
    match source {
        EventSource::Scores => ("scores", "\"timestamp\""),
        EventSource::Sessions => ("game_sessions", "start_time"),
    }
}

/// How `grouping` partitions rows before the outer `MAX` is taken.
fn group_by(grouping: Grouping, time_column: &str) -> String {
    match grouping {
        Grouping::GameDay => format!("GROUP BY game_id, ({time_column} AT TIME ZONE 'UTC')::DATE"),
        Grouping::Game => "GROUP BY game_id".to_string(),
        Grouping::Fleet => String::new(),
    }
}

/// The single-scalar query behind `fleet_max`. The window is bound at `$1`/`$2`;
/// `OpenSessions` additionally binds its instant at `$3`.
fn fleet_max_sql(metric: &FleetMetric) -> String {
    let (table, column, value, filter) = match metric {
        FleetMetric::DailyPlayers => ("game_sessions", "start_time", "COUNT(DISTINCT contestant_id)", ""),
        FleetMetric::DailySessions => ("game_sessions", "start_time", "COUNT(*)", ""),
        FleetMetric::Upvotes => ("game_upvotes", "\"timestamp\"", "COUNT(*)", ""),
        FleetMetric::SessionLength => ("game_sessions", "start_time", "MAX(session_length)::BIGINT", ""),
        FleetMetric::OpenSessions { .. } => (
            "game_sessions",
            "start_time",
            "COUNT(*)",
            " AND start_time <= $3 AND (end_time IS NULL OR end_time >= $3)",
        ),
    };
    format!(
        "SELECT MAX(n) FROM (
            SELECT {value} AS n FROM {table}
            WHERE {}{filter}
            {}
        ) AS grouped",
        window_clause(column, 1),
        group_by(metric.grouping(), column)
    )
}

fn to_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

fn unavailable(err: sqlx::Error) -> QueryError {
    tracing::error!(error = %err, "Event query failed");
    DbError::from(err).into()
}

fn game_from_row(row: &PgRow) -> Result<Game, sqlx::Error> {
    Ok(Game {
        id: GameId(row.try_get("id")?),
        name: row.try_get("name")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl EventQueryProvider for PgEventStore {
    async fn list_games(&self) -> Result<Vec<Game>, QueryError> {
        let rows = sqlx::query("SELECT id, name, is_active, created_at FROM games ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;
        rows.iter()
            .map(game_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(unavailable)
    }

    async fn count_scores(&self, game: GameId, window: TimeWindow) -> Result<u64, QueryError> {
        let sql = format!(
            "SELECT COUNT(*) FROM scores WHERE game_id = $1 AND {}",
            window_clause("\"timestamp\"", 2)
        );
        self.count(&sql, game, window).await
    }

    async fn count_distinct_participants(
        &self,
        game: GameId,
        source: EventSource,
        window: TimeWindow,
    ) -> Result<u64, QueryError> {
        let (table, column) = source_table(source);
        let sql = format!(
            "SELECT COUNT(DISTINCT contestant_id) FROM {table} WHERE game_id = $1 AND {}",
            window_clause(column, 2)
        );
        self.count(&sql, game, window).await
    }

    async fn count_sessions(&self, game: GameId, window: TimeWindow) -> Result<u64, QueryError> {
        let sql = format!(
            "SELECT COUNT(*) FROM game_sessions WHERE game_id = $1 AND {}",
            window_clause("start_time", 2)
        );
        self.count(&sql, game, window).await
    }

    async fn count_active_sessions(&self, game: GameId, at: DateTime<Utc>) -> Result<u64, QueryError> {
        let n: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM game_sessions
            WHERE game_id = $1 AND start_time <= $2 AND (end_time IS NULL OR end_time >= $2)
            "#,
        )
        .bind(game.0)
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(to_count(n))
    }

    async fn max_session_length(
        &self,
        game: GameId,
        window: TimeWindow,
    ) -> Result<Option<u32>, QueryError> {
        let sql = format!(
            "SELECT MAX(session_length) FROM game_sessions WHERE game_id = $1 AND {}",
            window_clause("start_time", 2)
        );
        let longest: Option<i32> = sqlx::query_scalar(&sql)
            .bind(game.0)
            .bind(window.start())
            .bind(window.end())
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(longest.and_then(|minutes| u32::try_from(minutes).ok()))
    }

    async fn count_upvotes(&self, game: GameId, window: TimeWindow) -> Result<u64, QueryError> {
        let sql = format!(
            "SELECT COUNT(*) FROM game_upvotes WHERE game_id = $1 AND {}",
            window_clause("\"timestamp\"", 2)
        );
        self.count(&sql, game, window).await
    }

    async fn last_event_time(
        &self,
        game: GameId,
        window: TimeWindow,
    ) -> Result<Option<DateTime<Utc>>, QueryError> {
        let sql = format!(
            "SELECT MAX(\"timestamp\") FROM scores WHERE game_id = $1 AND {}",
            window_clause("\"timestamp\"", 2)
        );
        sqlx::query_scalar(&sql)
            .bind(game.0)
            .bind(window.start())
            .bind(window.end())
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)
    }

    async fn fleet_max(&self, metric: FleetMetric, window: TimeWindow) -> Result<Option<u64>, QueryError> {
        let sql = fleet_max_sql(&metric);
        let mut query = sqlx::query_scalar::<_, Option<i64>>(&sql)
            .bind(window.start())
            .bind(window.end());
        if let FleetMetric::OpenSessions { at } = metric {
            query = query.bind(at);
        }
        let max = query.fetch_one(&self.pool).await.map_err(unavailable)?;
        tracing::debug!(metric = metric.name(), ?max, "Fleet maximum fetched");
        Ok(max.map(to_count))
    }

    async fn top_scores(&self, filter: LeaderboardFilter) -> Result<Vec<LeaderboardEntry>, QueryError> {
        let window = filter.window.unwrap_or_else(TimeWindow::unbounded);
        let sql = format!(
            r#"
            SELECT c.name AS contestant_name, g.name AS game_name, s.score, s."timestamp"
            FROM scores AS s
            JOIN contestants AS c ON c.id = s.contestant_id
            JOIN games AS g ON g.id = s.game_id
            WHERE ($1::BIGINT IS NULL OR s.game_id = $1) AND {}
            ORDER BY s.score DESC, s."timestamp" ASC
            "#,
            window_clause("s.\"timestamp\"", 2)
        );
        let rows = sqlx::query(&sql)
            .bind(filter.game.map(|g| g.0))
            .bind(window.start())
            .bind(window.end())
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        rows.iter()
            .map(|row| {
                Ok(LeaderboardEntry {
                    contestant_name: row.try_get("contestant_name")?,
                    game_name: row.try_get("game_name")?,
                    score: row.try_get("score")?,
                    timestamp: row.try_get("timestamp")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_clause_leaves_null_bounds_open() {
        assert_eq!(
            window_clause("start_time", 2),
            "($2::TIMESTAMPTZ IS NULL OR start_time >= $2) \
             AND ($3::TIMESTAMPTZ IS NULL OR start_time < $3)"
        );
    }

    #[test]
    fn fleet_queries_group_as_the_metric_declares() {
        let daily = fleet_max_sql(&FleetMetric::DailyPlayers);
        assert!(daily.contains("COUNT(DISTINCT contestant_id)"));
        assert!(daily.contains("GROUP BY game_id, (start_time AT TIME ZONE 'UTC')::DATE"));

        let upvotes = fleet_max_sql(&FleetMetric::Upvotes);
        assert!(upvotes.contains("FROM game_upvotes"));
        assert!(upvotes.contains("GROUP BY game_id"));

        let longest = fleet_max_sql(&FleetMetric::SessionLength);
        assert!(!longest.contains("GROUP BY"));

        let open = fleet_max_sql(&FleetMetric::OpenSessions { at: Utc::now() });
        assert!(open.contains("GROUP BY game_id"));
        assert!(!open.contains("::DATE"));
    }

    #[test]
    fn group_by_follows_the_declared_grouping() {
        assert_eq!(
            group_by(Grouping::GameDay, "start_time"),
            "GROUP BY game_id, (start_time AT TIME ZONE 'UTC')::DATE"
        );
        assert_eq!(group_by(Grouping::Game, "start_time"), "GROUP BY game_id");
        assert_eq!(group_by(Grouping::Fleet, "start_time"), "");
    }

    #[test]
    fn only_open_sessions_binds_a_third_parameter() {
        let at = Utc::now();
        for metric in [
            FleetMetric::DailyPlayers,
            FleetMetric::DailySessions,
            FleetMetric::Upvotes,
            FleetMetric::SessionLength,
        ] {
            assert!(!fleet_max_sql(&metric).contains("$3"), "{}", metric.name());
        }
        assert!(fleet_max_sql(&FleetMetric::OpenSessions { at }).contains("$3"));
    }

    #[test]
    fn score_gate_distinguishes_unknown_and_inactive_games() {
        assert!(matches!(check_gate(GameId(4), None), Err(DbError::UnknownGame(GameId(4)))));
        assert!(matches!(
            check_gate(GameId(4), Some(false)),
            Err(DbError::GameInactive(GameId(4)))
        ));
        assert!(check_gate(GameId(4), Some(true)).is_ok());
    }

    #[test]
    fn score_insert_is_conditional_on_the_active_flag() {
        assert!(RECORD_SCORE_SQL.contains("FROM target WHERE is_active"));
        assert!(RECORD_SCORE_SQL.contains("WHERE id = $1"));
    }

    #[test]
    fn negative_counts_clamp_to_zero() {
        assert_eq!(to_count(-1), 0);
        assert_eq!(to_count(42), 42);
    }

    #[test]
    fn db_errors_surface_as_data_unavailable() {
        let err: QueryError = DbError::UnknownGame(GameId(7)).into();
        assert!(matches!(err, QueryError::DataUnavailable(msg) if msg.contains('7')));
    }
}
