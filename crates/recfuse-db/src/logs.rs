//! Database operations for the append-only `recommendation_log` table.

use chrono::{DateTime, Utc};
use recfuse_core::LogRow;
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct LogRecord {
    method: String,
    user_id: Option<String>,
    logged_at: DateTime<Utc>,
    payload: Value,
}

/// Appends one structured log row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn append_log(pool: &PgPool, row: &LogRow) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO recommendation_log (method, user_id, logged_at, payload) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(&row.method)
    .bind(row.user_id.as_deref())
    .bind(row.logged_at)
    .bind(&row.payload)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns rows for `method` with `start <= logged_at < end`, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn query_log_window(
    pool: &PgPool,
    method: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<LogRow>, DbError> {
    let rows = sqlx::query_as::<_, LogRecord>(
        "SELECT method, user_id, logged_at, payload \
         FROM recommendation_log \
         WHERE method = $1 AND logged_at >= $2 AND logged_at < $3 \
         ORDER BY logged_at ASC, id ASC",
    )
    .bind(method)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| LogRow {
            method: r.method,
            user_id: r.user_id,
            logged_at: r.logged_at,
            payload: r.payload,
        })
        .collect())
}
