//! Fairness Auditor: computes distributional metrics over logged
//! recommendation responses, raises threshold alerts and renders a report.
//!
//! The auditor only reads the recommendation log. It writes audit records
//! and high-severity alerts back to the Metrics Store.

pub mod alerts;
pub mod metrics;
pub mod report;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Datelike, Utc};
use recfuse_core::{
    FairnessAuditRecord, MetricsSink, MetricsStore, StoreError, RECOMMENDATION_LOG_METHOD,
};
use thiserror::Error;

pub use alerts::{evaluate_alerts, AlertError, AlertSink, TracingAlertSink, WebhookAlertSink};
pub use metrics::compute_metrics;
pub use report::render_report;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("invalid audit window: start {start} is not before end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("metrics store error: {0}")]
    Store(#[from] StoreError),
}

/// Window of `days` ending at `end`.
#[must_use]
pub fn trailing_window(days: i64, end: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (end - chrono::Duration::days(days), end)
}

pub struct Auditor {
    store: Arc<dyn MetricsStore>,
    alert_sink: Arc<dyn AlertSink>,
    sink: Arc<dyn MetricsSink>,
}

impl Auditor {
    #[must_use]
    pub fn new(
        store: Arc<dyn MetricsStore>,
        alert_sink: Arc<dyn AlertSink>,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            store,
            alert_sink,
            sink,
        }
    }

    /// Audits `[start, end)`: persists the audit record with every alert,
    /// persists high and critical alerts as bias alerts and dispatches them.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidWindow`] for an empty or inverted window
    /// and [`AuditError::Store`] when the log cannot be read or the audit
    /// record cannot be written. Alert persistence and dispatch failures are
    /// logged only.
    pub async fn run_audit(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FairnessAuditRecord, AuditError> {
        let timer = Instant::now();
        let record = self.evaluate(start, end).await?;
        self.store.insert_audit_record(&record).await?;

        let mut dispatched = 0_u64;
        for alert in record.alerts.iter().filter(|a| a.severity.is_dispatched()) {
            if let Err(err) = self.store.insert_bias_alert(alert).await {
                tracing::warn!(
                    alert_type = %alert.alert_type,
                    error = %err,
                    "failed to persist bias alert"
                );
            }
            match self.alert_sink.dispatch(alert).await {
                Ok(()) => dispatched += 1,
                Err(err) => tracing::warn!(
                    alert_type = %alert.alert_type,
                    error = %err,
                    "failed to dispatch bias alert"
                ),
            }
        }

        let elapsed = u64::try_from(timer.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.sink.timing_ms("fairness.audit", elapsed);
        self.sink
            .increment("fairness.alerts", record.alerts.len() as u64);
        self.sink.increment("fairness.alerts_dispatched", dispatched);
        tracing::info!(
            window_start = %start,
            window_end = %end,
            recommendations = record.metrics.total_recommendations,
            alerts = record.alerts.len(),
            dispatched,
            elapsed_ms = elapsed,
            "fairness audit complete"
        );
        Ok(record)
    }

    /// Renders the report for `[start, end)` without persisting anything.
    ///
    /// # Errors
    ///
    /// Same as [`Auditor::run_audit`] minus the write paths.
    pub async fn generate_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<String, AuditError> {
        let record = self.evaluate(start, end).await?;
        Ok(render_report(&record))
    }

    async fn evaluate(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FairnessAuditRecord, AuditError> {
        if start >= end {
            return Err(AuditError::InvalidWindow { start, end });
        }
        let rows = self
            .store
            .query_log_window(RECOMMENDATION_LOG_METHOD, start, end)
            .await?;
        let (entries, skipped) = metrics::decode_entries(&rows);
        if skipped > 0 {
            self.sink.increment("fairness.malformed_rows", skipped as u64);
        }

        let metrics = compute_metrics(&entries, end.year());
        let now = Utc::now();
        let alerts = evaluate_alerts(&metrics, now);
        Ok(FairnessAuditRecord {
            window_start: start,
            window_end: end,
            metrics,
            alerts,
            created_at: now,
        })
    }
}
