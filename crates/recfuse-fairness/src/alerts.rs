//! Threshold evaluation and alert dispatch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recfuse_core::{AlertType, BiasAlert, FairnessMetrics, Severity};
use thiserror::Error;

pub const MIN_GENRES_PER_USER: f64 = 5.0;
pub const MAX_CREATOR_SHARE: f64 = 0.15;
pub const MIN_EXPLORATION_SCORE: f64 = 0.8;
pub const MAX_DEMOGRAPHIC_VARIANCE: f64 = 0.10;
/// Content-age balance below this is flagged in the report only.
pub const MIN_CONTENT_AGE_BALANCE: f64 = 0.8;

/// Applies every fixed threshold to `metrics`.
///
/// A window with no recommendations raises nothing.
#[must_use]
pub fn evaluate_alerts(metrics: &FairnessMetrics, now: DateTime<Utc>) -> Vec<BiasAlert> {
    if metrics.total_recommendations == 0 {
        return Vec::new();
    }
    let alert = |alert_type, severity, message: String, action: &str| BiasAlert {
        alert_type,
        severity,
        message,
        recommended_action: action.to_owned(),
        created_at: now,
    };

    let mut alerts = Vec::new();
    if metrics.avg_genres_per_user < MIN_GENRES_PER_USER {
        alerts.push(alert(
            AlertType::GenreConcentration,
            Severity::Medium,
            format!(
                "users received {:.1} distinct genres on average (minimum {MIN_GENRES_PER_USER})",
                metrics.avg_genres_per_user
            ),
            "Widen genre sampling in candidate queries or add a diversity re-rank step.",
        ));
    }

    for (creator, share) in &metrics.creator_shares {
        if *share > MAX_CREATOR_SHARE {
            alerts.push(alert(
                AlertType::CreatorDominance,
                Severity::High,
                format!(
                    "{creator} supplied {:.1}% of recommendations (maximum {:.0}%)",
                    share * 100.0,
                    MAX_CREATOR_SHARE * 100.0
                ),
                "Cap per-creator slots in ranked results and review network bonuses.",
            ));
        }
    }

    if metrics.exploration_score < MIN_EXPLORATION_SCORE {
        alerts.push(alert(
            AlertType::ExplorationDeficit,
            Severity::Medium,
            format!(
                "exploration score {:.2} below {MIN_EXPLORATION_SCORE} (familiar share {:.1}%)",
                metrics.exploration_score,
                metrics.familiar_proportion * 100.0
            ),
            "Rebalance familiar and novel items toward an 80/20 split.",
        ));
    }

    if metrics.demographic_variance > MAX_DEMOGRAPHIC_VARIANCE {
        alerts.push(alert(
            AlertType::DemographicInequity,
            Severity::High,
            format!(
                "engagement variance across buckets is {:.3} (maximum {})",
                metrics.demographic_variance, MAX_DEMOGRAPHIC_VARIANCE
            ),
            "Review scoring weights for buckets with low engagement.",
        ));
    }

    alerts
}

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("alert webhook returned HTTP {0}")]
    UnexpectedStatus(u16),
}

/// Notification channel for high-severity bias alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn dispatch(&self, alert: &BiasAlert) -> Result<(), AlertError>;
}

/// Emits alerts as `error!` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn dispatch(&self, alert: &BiasAlert) -> Result<(), AlertError> {
        tracing::error!(
            alert_type = %alert.alert_type,
            severity = %alert.severity,
            action = %alert.recommended_action,
            "bias alert: {}",
            alert.message
        );
        Ok(())
    }
}

/// POSTs each alert as JSON to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookAlertSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookAlertSink {
    /// # Errors
    ///
    /// Returns [`AlertError::Http`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, AlertError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn dispatch(&self, alert: &BiasAlert) -> Result<(), AlertError> {
        let body = serde_json::json!({
            "source": "recfuse-fairness",
            "alert": alert,
        });
        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AlertError::UnexpectedStatus(status.as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy_metrics() -> FairnessMetrics {
        FairnessMetrics {
            total_recommendations: 100,
            distinct_users: 10,
            avg_genres_per_user: 7.0,
            genre_diversity_index: 0.9,
            creator_shares: vec![("A".to_owned(), 0.15), ("B".to_owned(), 0.10)],
            creator_concentration_index: 0.1,
            recent_proportion: 0.7,
            content_age_balance: 1.0,
            familiar_proportion: 0.8,
            exploration_score: 1.0,
            bucket_engagement: vec![],
            demographic_variance: 0.01,
        }
    }

    #[test]
    fn healthy_window_raises_nothing() {
        assert!(evaluate_alerts(&healthy_metrics(), Utc::now()).is_empty());
    }

    #[test]
    fn empty_window_raises_nothing() {
        assert!(evaluate_alerts(&FairnessMetrics::default(), Utc::now()).is_empty());
    }

    #[test]
    fn one_alert_per_dominant_creator() {
        let metrics = FairnessMetrics {
            creator_shares: vec![
                ("A".to_owned(), 0.30),
                ("B".to_owned(), 0.20),
                ("C".to_owned(), 0.15),
            ],
            ..healthy_metrics()
        };
        let alerts = evaluate_alerts(&metrics, Utc::now());
        assert_eq!(alerts.len(), 2);
        assert!(alerts
            .iter()
            .all(|a| a.alert_type == AlertType::CreatorDominance && a.severity == Severity::High));
    }

    #[test]
    fn each_threshold_maps_to_its_alert() {
        let metrics = FairnessMetrics {
            avg_genres_per_user: 3.0,
            exploration_score: 0.7,
            demographic_variance: 0.2,
            ..healthy_metrics()
        };
        let alerts = evaluate_alerts(&metrics, Utc::now());
        let kinds: Vec<(AlertType, Severity)> =
            alerts.iter().map(|a| (a.alert_type, a.severity)).collect();
        assert_eq!(
            kinds,
            vec![
                (AlertType::GenreConcentration, Severity::Medium),
                (AlertType::ExplorationDeficit, Severity::Medium),
                (AlertType::DemographicInequity, Severity::High),
            ]
        );
    }
}
