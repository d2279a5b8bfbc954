use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recfuse_core::{
    AggregationRun, BiasAlert, FairnessAuditRecord, LogRow, MetricsStore, RetainedTable,
    StoreError, UserTemporalProfile,
};
use sqlx::PgPool;

use crate::{audits, logs, profiles, retention, runs};

/// [`MetricsStore`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgMetricsStore {
    pool: PgPool,
}

impl PgMetricsStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MetricsStore for PgMetricsStore {
    async fn upsert_profile(&self, profile: &UserTemporalProfile) -> Result<(), StoreError> {
        Ok(profiles::upsert_profile(&self.pool, profile).await?)
    }

    async fn get_profile(
        &self,
        user_id: &str,
    ) -> Result<Option<UserTemporalProfile>, StoreError> {
        Ok(profiles::get_profile(&self.pool, user_id).await?)
    }

    async fn insert_run_record(&self, run: &AggregationRun) -> Result<(), StoreError> {
        Ok(runs::insert_run(&self.pool, run).await?)
    }

    async fn latest_run(&self) -> Result<Option<AggregationRun>, StoreError> {
        Ok(runs::latest_run(&self.pool).await?)
    }

    async fn append_log(&self, row: &LogRow) -> Result<(), StoreError> {
        Ok(logs::append_log(&self.pool, row).await?)
    }

    async fn query_log_window(
        &self,
        method: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LogRow>, StoreError> {
        Ok(logs::query_log_window(&self.pool, method, start, end).await?)
    }

    async fn insert_audit_record(&self, record: &FairnessAuditRecord) -> Result<(), StoreError> {
        audits::insert_audit_record(&self.pool, record).await?;
        Ok(())
    }

    async fn insert_bias_alert(&self, alert: &BiasAlert) -> Result<(), StoreError> {
        audits::insert_bias_alert(&self.pool, alert).await?;
        Ok(())
    }

    async fn delete_older_than(
        &self,
        table: RetainedTable,
        cutoff: DateTime<Utc>,
        keep_latest: usize,
    ) -> Result<u64, StoreError> {
        Ok(retention::delete_older_than(&self.pool, table, cutoff, keep_latest).await?)
    }
}
