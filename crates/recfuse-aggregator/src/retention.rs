//! Post-run retention cleanup.

use chrono::{DateTime, Utc};
use recfuse_core::{MetricsStore, RetainedTable};
use serde::Serialize;

use crate::AggregatorConfig;

/// Rows deleted per table; a table whose cleanup failed is listed in
/// `failed_tables` and contributes nothing to the counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetentionSummary {
    pub profiles: u64,
    pub aggregation_runs: u64,
    pub recommendation_log: u64,
    pub fairness_audits: u64,
    pub bias_alerts: u64,
    pub failed_tables: Vec<&'static str>,
}

impl RetentionSummary {
    fn record(&mut self, table: RetainedTable, deleted: u64) {
        let slot = match table {
            RetainedTable::Profiles => &mut self.profiles,
            RetainedTable::AggregationRuns => &mut self.aggregation_runs,
            RetainedTable::RecommendationLog => &mut self.recommendation_log,
            RetainedTable::FairnessAudits => &mut self.fairness_audits,
            RetainedTable::BiasAlerts => &mut self.bias_alerts,
        };
        *slot = deleted;
    }
}

/// `(table, cutoff, rows always kept)` for each retained table.
fn plan(
    config: &AggregatorConfig,
    now: DateTime<Utc>,
) -> [(RetainedTable, DateTime<Utc>, usize); 5] {
    let profile_cutoff = now - config.profile_retention;
    let log_cutoff = now - config.log_retention;
    let keep = config.keep_snapshots;
    [
        (RetainedTable::Profiles, profile_cutoff, 0),
        (RetainedTable::RecommendationLog, log_cutoff, 0),
        (RetainedTable::AggregationRuns, log_cutoff, keep),
        (RetainedTable::FairnessAudits, log_cutoff, keep),
        (RetainedTable::BiasAlerts, log_cutoff, keep),
    ]
}

/// Applies every retention rule. Failures are logged and recorded, never
/// propagated.
pub(crate) async fn run_cleanup(
    store: &dyn MetricsStore,
    config: &AggregatorConfig,
    now: DateTime<Utc>,
) -> RetentionSummary {
    let mut summary = RetentionSummary::default();
    for (table, cutoff, keep) in plan(config, now) {
        match store.delete_older_than(table, cutoff, keep).await {
            Ok(deleted) => {
                if deleted > 0 {
                    tracing::info!(
                        table = table.table_name(),
                        deleted,
                        cutoff = %cutoff,
                        "retention cleanup"
                    );
                }
                summary.record(table, deleted);
            }
            Err(err) => {
                tracing::warn!(
                    table = table.table_name(),
                    error = %err,
                    "retention cleanup failed"
                );
                summary.failed_tables.push(table.table_name());
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_use_short_window_and_no_snapshot_floor() {
        let now = Utc::now();
        let config = AggregatorConfig::default();
        let rules = plan(&config, now);
        let (_, cutoff, keep) = rules
            .iter()
            .find(|(t, _, _)| *t == RetainedTable::Profiles)
            .copied()
            .unwrap();
        assert_eq!(cutoff, now - chrono::Duration::days(7));
        assert_eq!(keep, 0);
    }

    #[test]
    fn audit_tables_keep_snapshots() {
        let now = Utc::now();
        let config = AggregatorConfig {
            keep_snapshots: 3,
            ..AggregatorConfig::default()
        };
        for (table, cutoff, keep) in plan(&config, now) {
            if matches!(table, RetainedTable::FairnessAudits | RetainedTable::BiasAlerts) {
                assert_eq!(keep, 3);
                assert_eq!(cutoff, now - chrono::Duration::days(30));
            }
        }
    }
}
