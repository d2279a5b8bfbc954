//! Nightly Aggregator: recomputes per-user temporal profiles in bounded,
//! cancellable batches and records one [`AggregationRun`] per invocation.

pub mod health;
mod retention;
mod retry;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use recfuse_core::{
    AggregationRun, AggregationRunStats, AppConfig, BehaviorLog, MetricsSink, MetricsStore,
    RunStatus, StoreError,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub use health::{evaluate_health, HealthReport, HealthStatus};
pub use retention::RetentionSummary;

use retry::retry_transient;

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("failed to load active users: {0}")]
    ActiveUsers(#[source] StoreError),

    #[error("failed to persist aggregation run: {0}")]
    PersistRun(#[source] StoreError),

    #[error("metrics store error: {0}")]
    Store(#[from] StoreError),
}

/// Tunables for one Aggregator instance.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub active_window: chrono::Duration,
    pub batch_size: usize,
    pub concurrency: usize,
    pub freshness: chrono::Duration,
    /// Total attempts per user, including the first.
    pub max_attempts: u32,
    pub retry_base: Duration,
    pub batch_pause: Duration,
    pub profile_retention: chrono::Duration,
    pub log_retention: chrono::Duration,
    /// Newest audit/quality rows kept regardless of age.
    pub keep_snapshots: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            active_window: chrono::Duration::days(90),
            batch_size: 1000,
            concurrency: 20,
            freshness: chrono::Duration::hours(24),
            max_attempts: 3,
            retry_base: Duration::from_millis(500),
            batch_pause: Duration::from_millis(100),
            profile_retention: chrono::Duration::days(7),
            log_retention: chrono::Duration::days(30),
            keep_snapshots: 7,
        }
    }
}

impl AggregatorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            active_window: chrono::Duration::days(config.agg_active_window_days),
            batch_size: config.agg_batch_size,
            concurrency: config.agg_concurrency,
            freshness: chrono::Duration::hours(config.agg_freshness_hours),
            max_attempts: config.agg_max_attempts,
            retry_base: Duration::from_millis(config.agg_retry_base_ms),
            batch_pause: Duration::from_millis(config.agg_batch_pause_ms),
            profile_retention: chrono::Duration::days(config.profile_retention_days),
            log_retention: chrono::Duration::days(config.log_retention_days),
            keep_snapshots: config.keep_snapshots,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserOutcome {
    Processed,
    Skipped,
    Errored,
}

pub struct Aggregator {
    store: Arc<dyn MetricsStore>,
    behavior: Arc<dyn BehaviorLog>,
    sink: Arc<dyn MetricsSink>,
    config: AggregatorConfig,
}

impl Aggregator {
    #[must_use]
    pub fn new(
        store: Arc<dyn MetricsStore>,
        behavior: Arc<dyn BehaviorLog>,
        sink: Arc<dyn MetricsSink>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            store,
            behavior,
            sink,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Recompute stale profiles for every recently active user.
    ///
    /// `cancel` is checked before each batch. A cancelled run still runs
    /// retention cleanup, persists its partial stats as
    /// [`RunStatus::Cancelled`], and returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError::ActiveUsers`] when the active-user set
    /// cannot be loaded (a [`RunStatus::Failed`] run is still persisted on a
    /// best-effort basis), or [`AggregatorError::PersistRun`] when the final
    /// run record cannot be written.
    pub async fn run_aggregation(
        &self,
        cancel: &CancellationToken,
    ) -> Result<AggregationRunStats, AggregatorError> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let since = started_at - self.config.active_window;

        let users = match self.load_users(since).await {
            Ok(users) => users,
            Err(err) => {
                tracing::error!(error = %err, "aggregation aborted: active users unavailable");
                let run = self.build_run(
                    RunStatus::Failed,
                    started_at,
                    &timer,
                    AggregationRunStats::default(),
                    serde_json::json!({ "error": err.to_string() }),
                );
                if let Err(persist_err) = self.store.insert_run_record(&run).await {
                    tracing::error!(error = %persist_err, "failed to persist failed run record");
                }
                self.sink.increment("aggregation.runs.failed", 1);
                return Err(AggregatorError::ActiveUsers(err));
            }
        };

        let batch_size = self.config.batch_size.max(1);
        let total_batches = users.len().div_ceil(batch_size);
        tracing::info!(
            users = users.len(),
            batches = total_batches,
            concurrency = self.config.concurrency,
            "aggregation run starting"
        );

        let mut stats = AggregationRunStats::default();
        let mut cancelled = false;
        for (index, batch) in users.chunks(batch_size).enumerate() {
            if index > 0 && !self.config.batch_pause.is_zero() {
                tokio::select! {
                    () = cancel.cancelled() => {}
                    () = tokio::time::sleep(self.config.batch_pause) => {}
                }
            }
            if cancel.is_cancelled() {
                tracing::info!(
                    completed_batches = index,
                    remaining_batches = total_batches - index,
                    "cancellation requested, skipping remaining batches"
                );
                cancelled = true;
                break;
            }

            let batch_timer = Instant::now();
            let pending: Vec<_> = batch
                .iter()
                .map(|user_id| self.process_user(user_id, started_at))
                .collect();
            let outcomes: Vec<UserOutcome> = stream::iter(pending)
                .buffer_unordered(self.config.concurrency.max(1))
                .collect()
                .await;

            for outcome in &outcomes {
                match outcome {
                    UserOutcome::Processed => stats.processed += 1,
                    UserOutcome::Skipped => stats.skipped += 1,
                    UserOutcome::Errored => stats.errors += 1,
                }
            }
            stats.batches += 1;
            self.sink
                .timing_ms("aggregation.batch", elapsed_ms(&batch_timer));
            tracing::info!(
                batch = index + 1,
                of = total_batches,
                users = batch.len(),
                processed = stats.processed,
                skipped = stats.skipped,
                errors = stats.errors,
                "batch complete"
            );
        }

        let cleanup = retention::run_cleanup(self.store.as_ref(), &self.config, Utc::now()).await;

        let status = if cancelled {
            RunStatus::Cancelled
        } else {
            RunStatus::Succeeded
        };
        let context = serde_json::json!({
            "active_users": users.len(),
            "total_batches": total_batches,
            "cancelled": cancelled,
            "retention": cleanup,
        });
        let run = self.build_run(status, started_at, &timer, stats, context);

        let persisted = retry_transient(
            self.config.max_attempts,
            self.config.retry_base,
            "insert_run_record",
            || self.store.insert_run_record(&run),
        )
        .await;
        if let Err(err) = persisted.result {
            tracing::error!(run_id = %run.public_id, error = %err, "failed to persist run record");
            return Err(AggregatorError::PersistRun(err));
        }

        self.sink.increment("aggregation.users.processed", stats.processed);
        self.sink.increment("aggregation.users.skipped", stats.skipped);
        self.sink.increment("aggregation.users.errored", stats.errors);
        self.sink.timing_ms("aggregation.run", elapsed_ms(&timer));
        tracing::info!(
            run_id = %run.public_id,
            status = %status,
            processed = stats.processed,
            skipped = stats.skipped,
            errors = stats.errors,
            batches = stats.batches,
            duration_ms = run.duration_ms,
            "aggregation run finished"
        );
        Ok(stats)
    }

    /// Health of the pipeline as seen from the most recent run.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError::Store`] if the latest run cannot be read.
    pub async fn check_health(&self, now: DateTime<Utc>) -> Result<HealthReport, AggregatorError> {
        let latest = self.store.latest_run().await?;
        Ok(evaluate_health(latest.as_ref(), now))
    }

    /// Active users since `since`, de-duplicated, in first-seen order.
    async fn load_users(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let attempted = retry_transient(
            self.config.max_attempts,
            self.config.retry_base,
            "list_active_users",
            || self.behavior.list_active_users(since),
        )
        .await;
        let raw = attempted.result?;
        let mut seen = HashSet::with_capacity(raw.len());
        Ok(raw
            .into_iter()
            .filter(|u| seen.insert(u.clone()))
            .collect())
    }

    async fn process_user(&self, user_id: &str, now: DateTime<Utc>) -> UserOutcome {
        let attempted = retry_transient(
            self.config.max_attempts,
            self.config.retry_base,
            "process_user",
            || self.refresh_profile(user_id, now),
        )
        .await;
        match attempted.result {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(
                    user_id,
                    attempts = attempted.attempts,
                    transient = err.is_transient(),
                    error = %err,
                    "profile refresh failed"
                );
                UserOutcome::Errored
            }
        }
    }

    async fn refresh_profile(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UserOutcome, StoreError> {
        if let Some(existing) = self.store.get_profile(user_id).await? {
            if existing.is_fresh(now, self.config.freshness) {
                return Ok(UserOutcome::Skipped);
            }
        }
        let profile = self.behavior.compute_temporal_profile(user_id).await?;
        self.store.upsert_profile(&profile).await?;
        Ok(UserOutcome::Processed)
    }

    fn build_run(
        &self,
        status: RunStatus,
        started_at: DateTime<Utc>,
        timer: &Instant,
        stats: AggregationRunStats,
        context: serde_json::Value,
    ) -> AggregationRun {
        AggregationRun {
            public_id: Uuid::new_v4(),
            status,
            started_at,
            completed_at: Utc::now(),
            duration_ms: i64::try_from(timer.elapsed().as_millis()).unwrap_or(i64::MAX),
            stats,
            concurrency_limit: self.config.concurrency,
            context,
        }
    }
}

fn elapsed_ms(timer: &Instant) -> u64 {
    u64::try_from(timer.elapsed().as_millis()).unwrap_or(u64::MAX)
}
