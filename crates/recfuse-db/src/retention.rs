//! Age-based cleanup shared by every retained table.

use chrono::{DateTime, Utc};
use recfuse_core::RetainedTable;
use sqlx::PgPool;

use crate::{to_i64, DbError};

fn key_column(table: RetainedTable) -> &'static str {
    match table {
        RetainedTable::Profiles => "user_id",
        _ => "id",
    }
}

fn delete_statement(table: RetainedTable) -> String {
    let name = table.table_name();
    let ts = table.timestamp_column();
    let key = key_column(table);
    format!(
        "DELETE FROM {name} \
         WHERE {ts} < $1 \
           AND {key} NOT IN (SELECT {key} FROM {name} ORDER BY {ts} DESC LIMIT $2)"
    )
}

/// Deletes rows older than `cutoff` while sparing the newest `keep_latest`.
///
/// Table and column names come from [`RetainedTable`], never from input.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_older_than(
    pool: &PgPool,
    table: RetainedTable,
    cutoff: DateTime<Utc>,
    keep_latest: usize,
) -> Result<u64, DbError> {
    let keep = to_i64(keep_latest as u64, "keep_latest")?;
    let result = sqlx::query(&delete_statement(table))
        .bind(cutoff)
        .bind(keep)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
