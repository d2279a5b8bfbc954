//! Database operations for `user_temporal_profiles`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use recfuse_core::UserTemporalProfile;
use serde_json::{Map, Value};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `user_temporal_profiles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRow {
    pub user_id: String,
    pub avg_session_minutes: f64,
    pub total_watch_hours: f64,
    pub binge_session_count: i32,
    pub top_genres: Vec<String>,
    pub preferred_hours: Vec<i16>,
    pub device_split: Value,
    pub extensions: Value,
    pub last_computed_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for UserTemporalProfile {
    type Error = DbError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let device_split: BTreeMap<String, f64> = serde_json::from_value(row.device_split)
            .map_err(|source| DbError::Json {
                column: "device_split",
                source,
            })?;
        let extensions: Map<String, Value> =
            serde_json::from_value(row.extensions).map_err(|source| DbError::Json {
                column: "extensions",
                source,
            })?;
        let preferred_hours = row
            .preferred_hours
            .into_iter()
            .map(|h| u8::try_from(h).map_err(|_| DbError::OutOfRange("preferred_hours")))
            .collect::<Result<Vec<u8>, _>>()?;
        let binge_session_count = u32::try_from(row.binge_session_count)
            .map_err(|_| DbError::OutOfRange("binge_session_count"))?;

        Ok(UserTemporalProfile {
            user_id: row.user_id,
            avg_session_minutes: row.avg_session_minutes,
            total_watch_hours: row.total_watch_hours,
            binge_session_count,
            top_genres: row.top_genres,
            preferred_hours,
            device_split,
            extensions,
            last_computed_at: row.last_computed_at,
        })
    }
}

/// Inserts or overwrites the profile for `profile.user_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_profile(pool: &PgPool, profile: &UserTemporalProfile) -> Result<(), DbError> {
    let preferred_hours: Vec<i16> = profile.preferred_hours.iter().map(|&h| i16::from(h)).collect();
    let binge = i32::try_from(profile.binge_session_count)
        .map_err(|_| DbError::OutOfRange("binge_session_count"))?;
    let device_split = serde_json::to_value(&profile.device_split).map_err(|source| {
        DbError::Json {
            column: "device_split",
            source,
        }
    })?;

    sqlx::query(
        "INSERT INTO user_temporal_profiles \
             (user_id, avg_session_minutes, total_watch_hours, binge_session_count, \
              top_genres, preferred_hours, device_split, extensions, last_computed_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (user_id) DO UPDATE SET \
             avg_session_minutes = EXCLUDED.avg_session_minutes, \
             total_watch_hours   = EXCLUDED.total_watch_hours, \
             binge_session_count = EXCLUDED.binge_session_count, \
             top_genres          = EXCLUDED.top_genres, \
             preferred_hours     = EXCLUDED.preferred_hours, \
             device_split        = EXCLUDED.device_split, \
             extensions          = EXCLUDED.extensions, \
             last_computed_at    = EXCLUDED.last_computed_at",
    )
    .bind(&profile.user_id)
    .bind(profile.avg_session_minutes)
    .bind(profile.total_watch_hours)
    .bind(binge)
    .bind(&profile.top_genres)
    .bind(&preferred_hours)
    .bind(device_split)
    .bind(Value::Object(profile.extensions.clone()))
    .bind(profile.last_computed_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetches the stored profile for a user, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::Json`] if a
/// JSON column does not decode.
pub async fn get_profile(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<UserTemporalProfile>, DbError> {
    let row = sqlx::query_as::<_, ProfileRow>(
        "SELECT user_id, avg_session_minutes, total_watch_hours, binge_session_count, \
                top_genres, preferred_hours, device_split, extensions, last_computed_at \
         FROM user_temporal_profiles \
         WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(UserTemporalProfile::try_from).transpose()
}
