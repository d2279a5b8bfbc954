//! In-process [`MetricsStore`] used by tests and local dry runs.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::audit::{BiasAlert, FairnessAuditRecord};
use crate::profile::UserTemporalProfile;
use crate::run::AggregationRun;
use crate::store::{LogRow, MetricsStore, RetainedTable, StoreError};

#[derive(Debug, Default)]
struct State {
    profiles: BTreeMap<String, UserTemporalProfile>,
    runs: Vec<AggregationRun>,
    logs: Vec<LogRow>,
    audits: Vec<FairnessAuditRecord>,
    alerts: Vec<BiasAlert>,
}

#[derive(Debug, Default)]
pub struct InMemoryMetricsStore {
    state: Mutex<State>,
}

impl InMemoryMetricsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn profiles(&self) -> Vec<UserTemporalProfile> {
        self.state.lock().await.profiles.values().cloned().collect()
    }

    pub async fn runs(&self) -> Vec<AggregationRun> {
        self.state.lock().await.runs.clone()
    }

    pub async fn logs(&self) -> Vec<LogRow> {
        self.state.lock().await.logs.clone()
    }

    pub async fn audits(&self) -> Vec<FairnessAuditRecord> {
        self.state.lock().await.audits.clone()
    }

    pub async fn bias_alerts(&self) -> Vec<BiasAlert> {
        self.state.lock().await.alerts.clone()
    }
}

/// Remove rows older than `cutoff` except the `keep_latest` newest ones.
fn retain_recent<T>(
    rows: &mut Vec<T>,
    timestamp: impl Fn(&T) -> DateTime<Utc>,
    cutoff: DateTime<Utc>,
    keep_latest: usize,
) -> u64 {
    let mut by_age: Vec<(usize, DateTime<Utc>)> =
        rows.iter().enumerate().map(|(i, r)| (i, timestamp(r))).collect();
    by_age.sort_by(|a, b| b.1.cmp(&a.1));
    let protected: HashSet<usize> = by_age.iter().take(keep_latest).map(|(i, _)| *i).collect();

    let before = rows.len();
    let mut index = 0;
    rows.retain(|row| {
        let keep = protected.contains(&index) || timestamp(row) >= cutoff;
        index += 1;
        keep
    });
    (before - rows.len()) as u64
}

#[async_trait]
impl MetricsStore for InMemoryMetricsStore {
    async fn upsert_profile(&self, profile: &UserTemporalProfile) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn get_profile(
        &self,
        user_id: &str,
    ) -> Result<Option<UserTemporalProfile>, StoreError> {
        Ok(self.state.lock().await.profiles.get(user_id).cloned())
    }

    async fn insert_run_record(&self, run: &AggregationRun) -> Result<(), StoreError> {
        self.state.lock().await.runs.push(run.clone());
        Ok(())
    }

    async fn latest_run(&self) -> Result<Option<AggregationRun>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.runs.iter().max_by_key(|r| r.started_at).cloned())
    }

    async fn append_log(&self, row: &LogRow) -> Result<(), StoreError> {
        self.state.lock().await.logs.push(row.clone());
        Ok(())
    }

    async fn query_log_window(
        &self,
        method: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LogRow>, StoreError> {
        let state = self.state.lock().await;
        let mut rows: Vec<LogRow> = state
            .logs
            .iter()
            .filter(|r| r.method == method && r.logged_at >= start && r.logged_at < end)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.logged_at);
        Ok(rows)
    }

    async fn insert_audit_record(&self, record: &FairnessAuditRecord) -> Result<(), StoreError> {
        self.state.lock().await.audits.push(record.clone());
        Ok(())
    }

    async fn insert_bias_alert(&self, alert: &BiasAlert) -> Result<(), StoreError> {
        self.state.lock().await.alerts.push(alert.clone());
        Ok(())
    }

    async fn delete_older_than(
        &self,
        table: RetainedTable,
        cutoff: DateTime<Utc>,
        keep_latest: usize,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let deleted = match table {
            RetainedTable::Profiles => {
                let mut rows: Vec<UserTemporalProfile> =
                    std::mem::take(&mut state.profiles).into_values().collect();
                let deleted = retain_recent(&mut rows, |p| p.last_computed_at, cutoff, keep_latest);
                state.profiles = rows.into_iter().map(|p| (p.user_id.clone(), p)).collect();
                deleted
            }
            RetainedTable::AggregationRuns => {
                retain_recent(&mut state.runs, |r| r.started_at, cutoff, keep_latest)
            }
            RetainedTable::RecommendationLog => {
                retain_recent(&mut state.logs, |r| r.logged_at, cutoff, keep_latest)
            }
            RetainedTable::FairnessAudits => {
                retain_recent(&mut state.audits, |r| r.created_at, cutoff, keep_latest)
            }
            RetainedTable::BiasAlerts => {
                retain_recent(&mut state.alerts, |r| r.created_at, cutoff, keep_latest)
            }
        };
        Ok(deleted)
    }
}
