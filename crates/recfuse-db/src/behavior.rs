//! Behavior-log reader over the `watch_sessions` table.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use recfuse_core::{compute_profile, BehaviorLog, StoreError, UserTemporalProfile, WatchSession};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct SessionRow {
    user_id: String,
    title_id: String,
    started_at: DateTime<Utc>,
    duration_minutes: f64,
    genres: Vec<String>,
    device: String,
}

/// Returns distinct users with a session at or after `since`, ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_users(
    pool: &PgPool,
    since: DateTime<Utc>,
) -> Result<Vec<String>, DbError> {
    let users = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT user_id FROM watch_sessions WHERE started_at >= $1 ORDER BY user_id",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// Returns a user's sessions started at or after `since`, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_user_sessions(
    pool: &PgPool,
    user_id: &str,
    since: DateTime<Utc>,
) -> Result<Vec<WatchSession>, DbError> {
    let rows = sqlx::query_as::<_, SessionRow>(
        "SELECT user_id, title_id, started_at, duration_minutes, genres, device \
         FROM watch_sessions \
         WHERE user_id = $1 AND started_at >= $2 \
         ORDER BY started_at ASC",
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| WatchSession {
            user_id: r.user_id,
            title_id: r.title_id,
            started_at: r.started_at,
            duration_minutes: r.duration_minutes,
            genres: r.genres,
            device: r.device,
        })
        .collect())
}

/// [`BehaviorLog`] backed by Postgres. Profiles are computed from sessions
/// inside the trailing `lookback` window.
#[derive(Debug, Clone)]
pub struct PgBehaviorLog {
    pool: PgPool,
    lookback: Duration,
}

impl PgBehaviorLog {
    #[must_use]
    pub fn new(pool: PgPool, lookback_days: i64) -> Self {
        Self {
            pool,
            lookback: Duration::days(lookback_days),
        }
    }
}

#[async_trait]
impl BehaviorLog for PgBehaviorLog {
    async fn list_active_users(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        Ok(list_active_users(&self.pool, since).await?)
    }

    async fn compute_temporal_profile(
        &self,
        user_id: &str,
    ) -> Result<UserTemporalProfile, StoreError> {
        let now = Utc::now();
        let sessions = list_user_sessions(&self.pool, user_id, now - self.lookback).await?;
        Ok(compute_profile(user_id, &sessions, now))
    }
}
