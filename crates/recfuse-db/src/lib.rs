use recfuse_core::StoreError;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;

pub mod audits;
pub mod behavior;
pub mod logs;
pub mod profiles;
pub mod retention;
pub mod runs;
mod store;

pub use behavior::{list_active_users, list_user_sessions, PgBehaviorLog};
pub use store::PgMetricsStore;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/recfuse-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &recfuse_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("stored JSON for {column} is malformed: {source}")]
    Json {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("value out of range for {0}")]
    OutOfRange(&'static str),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// SQLSTATE codes for serialization failure, deadlock, and lock-not-available.
const LOCK_CONTENTION_CODES: [&str; 3] = ["40001", "40P01", "55P03"];

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => StoreError::NotFound,
            DbError::Json { .. } | DbError::OutOfRange(_) => StoreError::Malformed(err.to_string()),
            DbError::Migration(e) => StoreError::Other(e.to_string()),
            DbError::Sqlx(e) => classify_sqlx(&e),
        }
    }
}

fn classify_sqlx(err: &sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(err.to_string()),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Connection(err.to_string()),
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db)
            if db
                .code()
                .is_some_and(|code| LOCK_CONTENTION_CODES.contains(&code.as_ref())) =>
        {
            StoreError::LockContention(err.to_string())
        }
        sqlx::Error::Decode(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::TypeNotFound { .. } => StoreError::Malformed(err.to_string()),
        _ => StoreError::Other(err.to_string()),
    }
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

pub(crate) fn to_i64(value: u64, column: &'static str) -> Result<i64, DbError> {
    i64::try_from(value).map_err(|_| DbError::OutOfRange(column))
}

pub(crate) fn to_u64(value: i64, column: &'static str) -> Result<u64, DbError> {
    u64::try_from(value).map_err(|_| DbError::OutOfRange(column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_has_sane_defaults() {
        let config = PoolConfig::default();

        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.min_connections, DEFAULT_MIN_CONNECTIONS);
        assert_eq!(config.acquire_timeout_secs, DEFAULT_ACQUIRE_TIMEOUT_SECS);
    }

    #[test]
    fn pool_timeout_is_transient() {
        let err: StoreError = DbError::Sqlx(sqlx::Error::PoolTimedOut).into();
        assert!(err.is_transient());
    }

    #[test]
    fn row_not_found_is_permanent() {
        let err: StoreError = DbError::Sqlx(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, StoreError::NotFound));
        assert!(!err.is_transient());
    }

    #[test]
    fn out_of_range_counts_are_malformed() {
        let err: StoreError = to_u64(-1, "users_processed").unwrap_err().into();
        assert!(matches!(err, StoreError::Malformed(_)));
    }
}
