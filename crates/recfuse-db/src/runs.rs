//! Database operations for `aggregation_runs`.

use chrono::{DateTime, Utc};
use recfuse_core::{AggregationRun, AggregationRunStats, RunStatus};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{to_i64, to_u64, DbError};

/// A row from the `aggregation_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AggregationRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub users_processed: i64,
    pub users_skipped: i64,
    pub error_count: i64,
    pub batch_count: i64,
    pub concurrency_limit: i32,
    pub context: Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AggregationRunRow> for AggregationRun {
    type Error = DbError;

    fn try_from(row: AggregationRunRow) -> Result<Self, Self::Error> {
        Ok(AggregationRun {
            public_id: row.public_id,
            status: RunStatus::parse(&row.status),
            started_at: row.started_at,
            completed_at: row.completed_at,
            duration_ms: row.duration_ms,
            stats: AggregationRunStats {
                processed: to_u64(row.users_processed, "users_processed")?,
                skipped: to_u64(row.users_skipped, "users_skipped")?,
                errors: to_u64(row.error_count, "error_count")?,
                batches: to_u64(row.batch_count, "batch_count")?,
            },
            concurrency_limit: usize::try_from(row.concurrency_limit)
                .map_err(|_| DbError::OutOfRange("concurrency_limit"))?,
            context: row.context,
        })
    }
}

/// Appends a finalized run record.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_run(pool: &PgPool, run: &AggregationRun) -> Result<(), DbError> {
    let concurrency = i32::try_from(run.concurrency_limit)
        .map_err(|_| DbError::OutOfRange("concurrency_limit"))?;

    sqlx::query(
        "INSERT INTO aggregation_runs \
             (public_id, status, started_at, completed_at, duration_ms, users_processed, \
              users_skipped, error_count, batch_count, concurrency_limit, context) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(run.public_id)
    .bind(run.status.as_str())
    .bind(run.started_at)
    .bind(run.completed_at)
    .bind(run.duration_ms)
    .bind(to_i64(run.stats.processed, "users_processed")?)
    .bind(to_i64(run.stats.skipped, "users_skipped")?)
    .bind(to_i64(run.stats.errors, "error_count")?)
    .bind(to_i64(run.stats.batches, "batch_count")?)
    .bind(concurrency)
    .bind(&run.context)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns the most recently started run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_run(pool: &PgPool) -> Result<Option<AggregationRun>, DbError> {
    let row = sqlx::query_as::<_, AggregationRunRow>(
        "SELECT id, public_id, status, started_at, completed_at, duration_ms, \
                users_processed, users_skipped, error_count, batch_count, \
                concurrency_limit, context, created_at \
         FROM aggregation_runs \
         ORDER BY started_at DESC, id DESC \
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    row.map(AggregationRun::try_from).transpose()
}
