//! Background job scheduler.
//!
//! Registers the nightly aggregation and the weekly fairness audit. Both
//! jobs share the process-wide [`CancellationToken`] so a shutdown signal
//! stops an in-progress aggregation at its next batch boundary.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use recfuse_aggregator::Aggregator;
use recfuse_core::AppConfig;
use recfuse_fairness::{trailing_window, Auditor};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tokio_util::sync::CancellationToken;

/// Running scheduler plus the guard held while an aggregation is in flight.
pub struct SchedulerHandle {
    scheduler: JobScheduler,
    aggregation_guard: Arc<Mutex<()>>,
}

impl SchedulerHandle {
    /// Stops firing new jobs, then waits up to `grace` for an in-flight
    /// aggregation to persist its run record.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the scheduler fails to shut down.
    pub async fn shutdown(mut self, grace: Duration) -> Result<(), JobSchedulerError> {
        self.scheduler.shutdown().await?;
        if tokio::time::timeout(grace, self.aggregation_guard.lock())
            .await
            .is_err()
        {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "scheduler: aggregation still running at shutdown deadline"
            );
        }
        Ok(())
    }
}

/// Builds and starts the background job scheduler.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    aggregator: Arc<Aggregator>,
    auditor: Arc<Auditor>,
    config: &AppConfig,
    cancel: CancellationToken,
) -> Result<SchedulerHandle, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    let aggregation_guard = Arc::new(Mutex::new(()));

    register_aggregation_job(
        &scheduler,
        &config.aggregation_cron,
        aggregator,
        Arc::clone(&aggregation_guard),
        cancel,
    )
    .await?;
    register_audit_job(
        &scheduler,
        &config.audit_cron,
        auditor,
        config.audit_window_days,
    )
    .await?;

    scheduler.start().await?;
    Ok(SchedulerHandle {
        scheduler,
        aggregation_guard,
    })
}

/// Nightly profile refresh. A tick that fires while the previous run is
/// still going is skipped.
async fn register_aggregation_job(
    scheduler: &JobScheduler,
    cron: &str,
    aggregator: Arc<Aggregator>,
    guard: Arc<Mutex<()>>,
    cancel: CancellationToken,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let aggregator = Arc::clone(&aggregator);
        let guard = Arc::clone(&guard);
        let cancel = cancel.clone();

        Box::pin(async move {
            let Ok(_running) = guard.try_lock() else {
                tracing::warn!("scheduler: previous aggregation still running; skipping tick");
                return;
            };
            if cancel.is_cancelled() {
                return;
            }

            tracing::info!("scheduler: starting nightly aggregation");
            match aggregator.run_aggregation(&cancel).await {
                Ok(stats) if cancel.is_cancelled() => tracing::warn!(
                    processed = stats.processed,
                    batches = stats.batches,
                    "scheduler: nightly aggregation cancelled"
                ),
                Ok(stats) => tracing::info!(
                    processed = stats.processed,
                    skipped = stats.skipped,
                    errors = stats.errors,
                    "scheduler: nightly aggregation complete"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: nightly aggregation failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Weekly fairness audit over the trailing window.
async fn register_audit_job(
    scheduler: &JobScheduler,
    cron: &str,
    auditor: Arc<Auditor>,
    window_days: i64,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let auditor = Arc::clone(&auditor);

        Box::pin(async move {
            let (start, end) = trailing_window(window_days, Utc::now());
            tracing::info!(%start, %end, "scheduler: starting fairness audit");
            match auditor.run_audit(start, end).await {
                Ok(record) => tracing::info!(
                    alerts = record.alerts.len(),
                    recommendations = record.metrics.total_recommendations,
                    "scheduler: fairness audit complete"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: fairness audit failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
