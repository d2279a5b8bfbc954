//! Aggregation run bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    /// Stopped early by a shutdown signal; stats cover completed batches only.
    Cancelled,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
        }
    }

    /// Parse the stored column value. Unknown values map to `Failed`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "succeeded" => RunStatus::Succeeded,
            "cancelled" => RunStatus::Cancelled,
            _ => RunStatus::Failed,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-run counters returned by the Aggregator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationRunStats {
    pub processed: u64,
    pub skipped: u64,
    pub errors: u64,
    pub batches: u64,
}

impl AggregationRunStats {
    /// Errors as a fraction of users that were attempted (processed + errored).
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        let attempted = self.processed + self.errors;
        if attempted == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.errors as f64 / attempted as f64;
        rate
    }
}

/// One persisted record per Aggregator invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationRun {
    pub public_id: Uuid,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub stats: AggregationRunStats,
    pub concurrency_limit: usize,
    /// Free-form context: cancellation flag, cleanup counts, failure message.
    pub context: Value,
}
