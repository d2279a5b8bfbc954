//! Collaborator seams: the Metrics Store and the behavior-log reader.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::audit::{BiasAlert, FairnessAuditRecord};
use crate::profile::UserTemporalProfile;
use crate::run::AggregationRun;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("lock contention: {0}")]
    LockContention(String),

    #[error("malformed data: {0}")]
    Malformed(String),

    #[error("record not found")]
    NotFound,

    #[error("store error: {0}")]
    Other(String),
}

impl StoreError {
    /// Connection, timeout and lock-contention failures are worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Connection(_) | StoreError::Timeout(_) | StoreError::LockContention(_)
        )
    }
}

/// A free-form structured log row keyed by method name and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRow {
    pub method: String,
    pub user_id: Option<String>,
    pub logged_at: DateTime<Utc>,
    pub payload: Value,
}

/// Tables subject to retention cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetainedTable {
    Profiles,
    AggregationRuns,
    RecommendationLog,
    FairnessAudits,
    BiasAlerts,
}

impl RetainedTable {
    #[must_use]
    pub fn table_name(self) -> &'static str {
        match self {
            RetainedTable::Profiles => "user_temporal_profiles",
            RetainedTable::AggregationRuns => "aggregation_runs",
            RetainedTable::RecommendationLog => "recommendation_log",
            RetainedTable::FairnessAudits => "fairness_audits",
            RetainedTable::BiasAlerts => "bias_alerts",
        }
    }

    #[must_use]
    pub fn timestamp_column(self) -> &'static str {
        match self {
            RetainedTable::Profiles => "last_computed_at",
            RetainedTable::AggregationRuns => "started_at",
            RetainedTable::RecommendationLog => "logged_at",
            RetainedTable::FairnessAudits | RetainedTable::BiasAlerts => "created_at",
        }
    }
}

#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Insert or overwrite the profile keyed by `user_id`.
    async fn upsert_profile(&self, profile: &UserTemporalProfile) -> Result<(), StoreError>;

    async fn get_profile(&self, user_id: &str)
        -> Result<Option<UserTemporalProfile>, StoreError>;

    async fn insert_run_record(&self, run: &AggregationRun) -> Result<(), StoreError>;

    /// Most recently started run, if any.
    async fn latest_run(&self) -> Result<Option<AggregationRun>, StoreError>;

    async fn append_log(&self, row: &LogRow) -> Result<(), StoreError>;

    /// Rows for `method` with `start <= logged_at < end`, oldest first.
    async fn query_log_window(
        &self,
        method: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LogRow>, StoreError>;

    async fn insert_audit_record(&self, record: &FairnessAuditRecord) -> Result<(), StoreError>;

    async fn insert_bias_alert(&self, alert: &BiasAlert) -> Result<(), StoreError>;

    /// Delete rows older than `cutoff`, always sparing the newest
    /// `keep_latest` rows of the table. Returns the number deleted.
    async fn delete_older_than(
        &self,
        table: RetainedTable,
        cutoff: DateTime<Utc>,
        keep_latest: usize,
    ) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait BehaviorLog: Send + Sync {
    /// Distinct users with any activity at or after `since`.
    async fn list_active_users(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError>;

    async fn compute_temporal_profile(
        &self,
        user_id: &str,
    ) -> Result<UserTemporalProfile, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(StoreError::Connection("reset".into()).is_transient());
        assert!(StoreError::Timeout("pool".into()).is_transient());
        assert!(StoreError::LockContention("40P01".into()).is_transient());
        assert!(!StoreError::Malformed("bad json".into()).is_transient());
        assert!(!StoreError::NotFound.is_transient());
    }
}
