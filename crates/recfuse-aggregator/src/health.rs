//! Operational health derived from the most recent aggregation run.

use chrono::{DateTime, Duration, Utc};
use recfuse_core::{AggregationRun, RunStatus};
use serde::Serialize;
use uuid::Uuid;

/// A run older than this is overdue.
pub const STALE_AFTER_HOURS: i64 = 25;
/// A run older than this means the schedule has stopped.
pub const DEAD_AFTER_HOURS: i64 = 48;
/// Error share of attempted users above which a run is degraded.
pub const MAX_ERROR_RATE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Error,
}

impl HealthStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub last_run_id: Option<Uuid>,
    pub last_run_status: Option<RunStatus>,
    pub last_run_completed_at: Option<DateTime<Utc>>,
    /// Seconds since the last run completed.
    pub last_run_age_secs: Option<i64>,
    pub error_rate: Option<f64>,
    pub issues: Vec<String>,
}

/// Pure health evaluation over the latest run.
#[must_use]
pub fn evaluate_health(latest: Option<&AggregationRun>, now: DateTime<Utc>) -> HealthReport {
    let Some(run) = latest else {
        return HealthReport {
            status: HealthStatus::Error,
            last_run_id: None,
            last_run_status: None,
            last_run_completed_at: None,
            last_run_age_secs: None,
            error_rate: None,
            issues: vec!["no aggregation run has been recorded".to_owned()],
        };
    };

    let mut status = HealthStatus::Healthy;
    let mut issues = Vec::new();
    let mut raise = |level: HealthStatus, issue: String| {
        status = status.max(level);
        issues.push(issue);
    };

    let age = now.signed_duration_since(run.completed_at);
    if age >= Duration::hours(DEAD_AFTER_HOURS) {
        raise(
            HealthStatus::Error,
            format!("last run completed {}h ago", age.num_hours()),
        );
    } else if age >= Duration::hours(STALE_AFTER_HOURS) {
        raise(
            HealthStatus::Warning,
            format!("last run completed {}h ago", age.num_hours()),
        );
    }

    match run.status {
        RunStatus::Failed => raise(HealthStatus::Error, "last run failed".to_owned()),
        RunStatus::Cancelled => raise(
            HealthStatus::Warning,
            format!(
                "last run was cancelled after {} batches",
                run.stats.batches
            ),
        ),
        RunStatus::Succeeded => {}
    }

    let error_rate = run.stats.error_rate();
    if error_rate > MAX_ERROR_RATE {
        raise(
            HealthStatus::Warning,
            format!(
                "error rate {:.1}% exceeds {:.0}% ({} errors)",
                error_rate * 100.0,
                MAX_ERROR_RATE * 100.0,
                run.stats.errors
            ),
        );
    }

    HealthReport {
        status,
        last_run_id: Some(run.public_id),
        last_run_status: Some(run.status),
        last_run_completed_at: Some(run.completed_at),
        last_run_age_secs: Some(age.num_seconds()),
        error_rate: Some(error_rate),
        issues,
    }
}
