//! Fairness audit records and bias alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    GenreConcentration,
    CreatorDominance,
    ExplorationDeficit,
    DemographicInequity,
}

impl AlertType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AlertType::GenreConcentration => "genre_concentration",
            AlertType::CreatorDominance => "creator_dominance",
            AlertType::ExplorationDeficit => "exploration_deficit",
            AlertType::DemographicInequity => "demographic_inequity",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// High and critical alerts are persisted individually and dispatched.
    #[must_use]
    pub fn is_dispatched(self) -> bool {
        self >= Severity::High
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasAlert {
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    pub recommended_action: String,
    pub created_at: DateTime<Utc>,
}

/// Distributional metrics over one audit window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FairnessMetrics {
    pub total_recommendations: u64,
    pub distinct_users: u64,
    pub avg_genres_per_user: f64,
    /// Shannon entropy of the genre distribution, normalized to 0-1.
    pub genre_diversity_index: f64,
    /// Creator name to share of recommendation volume, largest first.
    pub creator_shares: Vec<(String, f64)>,
    /// Herfindahl index over creator shares (0-1).
    pub creator_concentration_index: f64,
    pub recent_proportion: f64,
    pub content_age_balance: f64,
    pub familiar_proportion: f64,
    pub exploration_score: f64,
    /// Mean normalized score per demographic bucket.
    pub bucket_engagement: Vec<(String, f64)>,
    pub demographic_variance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessAuditRecord {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub metrics: FairnessMetrics,
    pub alerts: Vec<BiasAlert>,
    pub created_at: DateTime<Utc>,
}

impl FairnessAuditRecord {
    pub fn alerts_of(&self, alert_type: AlertType) -> impl Iterator<Item = &BiasAlert> {
        self.alerts.iter().filter(move |a| a.alert_type == alert_type)
    }
}
