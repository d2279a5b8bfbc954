//! Auditor tests against the in-memory Metrics Store, plus the webhook sink
//! against a wiremock server.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use recfuse_core::{
    AlertType, BiasAlert, InMemoryMetricsStore, LogRow, LoggedItem, MetricsStore,
    NoopMetricsSink, RecommendationLogEntry, Severity, Source, RECOMMENDATION_LOG_METHOD,
};
use recfuse_fairness::{AlertError, AlertSink, AuditError, Auditor, WebhookAlertSink};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingSink {
    alerts: Mutex<Vec<BiasAlert>>,
    fail: bool,
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn dispatch(&self, alert: &BiasAlert) -> Result<(), AlertError> {
        self.alerts.lock().unwrap().push(alert.clone());
        if self.fail {
            return Err(AlertError::UnexpectedStatus(503));
        }
        Ok(())
    }
}

const GENRES: [&str; 6] = ["Drama", "Comedy", "Crime", "Horror", "Documentary", "Animation"];

fn item(index: usize, creator: &str, genres: &[&str], novel: bool) -> LoggedItem {
    LoggedItem {
        canonical_id: format!("title-{index}"),
        genres: genres.iter().map(|g| (*g).to_owned()).collect(),
        creator: Some(creator.to_owned()),
        release_year: Some(2025),
        score: 60.0,
        source: Source::Primary,
        novel,
    }
}

async fn log_entry(
    store: &InMemoryMetricsStore,
    at: DateTime<Utc>,
    entry: &RecommendationLogEntry,
) {
    let row = LogRow {
        method: RECOMMENDATION_LOG_METHOD.to_owned(),
        user_id: Some(entry.user_id.clone()),
        logged_at: at,
        payload: serde_json::to_value(entry).unwrap(),
    };
    store.append_log(&row).await.unwrap();
}

/// 20 items for one user: creator A supplies 8, creators B through E 3 each.
/// Genres and novelty sit within every other threshold.
fn dominated_entry() -> RecommendationLogEntry {
    let mut creators = vec!["A"; 8];
    for creator in ["B", "C", "D", "E"] {
        creators.extend([creator; 3]);
    }
    let items = creators
        .into_iter()
        .enumerate()
        .map(|(i, creator)| item(i, creator, &[GENRES[i % GENRES.len()]], i % 5 == 0))
        .collect();
    RecommendationLogEntry {
        user_id: "user-1".to_owned(),
        demographic_bucket: Some("25-34".to_owned()),
        items,
    }
}

fn auditor(store: &Arc<InMemoryMetricsStore>, sink: &Arc<RecordingSink>) -> Auditor {
    Auditor::new(store.clone(), sink.clone(), Arc::new(NoopMetricsSink))
}

#[tokio::test]
async fn dominant_creator_raises_one_high_alert() {
    let store = Arc::new(InMemoryMetricsStore::new());
    let sink = Arc::new(RecordingSink::default());
    let now = Utc::now();
    log_entry(&store, now - Duration::days(1), &dominated_entry()).await;

    let record = auditor(&store, &sink)
        .run_audit(now - Duration::days(7), now)
        .await
        .unwrap();

    assert_eq!(record.metrics.total_recommendations, 20);
    let dominance: Vec<&BiasAlert> = record.alerts_of(AlertType::CreatorDominance).collect();
    assert_eq!(dominance.len(), 1);
    assert_eq!(dominance[0].severity, Severity::High);
    assert!(dominance[0].message.starts_with("A supplied 40.0%"));
    assert_eq!(record.alerts.len(), 1);

    assert_eq!(store.audits().await.len(), 1);
    assert_eq!(store.bias_alerts().await, dominance.into_iter().cloned().collect::<Vec<_>>());
    assert_eq!(sink.alerts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn narrow_genre_mix_raises_medium_alert_without_dispatch() {
    let store = Arc::new(InMemoryMetricsStore::new());
    let sink = Arc::new(RecordingSink::default());
    let now = Utc::now();
    // Two users with three genres each, ten creators, one novel item in five.
    for user in ["u1", "u2"] {
        let items = (0..10)
            .map(|i| item(i, &format!("creator-{i}"), &[GENRES[i % 3]], i % 5 == 0))
            .collect();
        let entry = RecommendationLogEntry {
            user_id: user.to_owned(),
            demographic_bucket: None,
            items,
        };
        log_entry(&store, now - Duration::hours(2), &entry).await;
    }

    let record = auditor(&store, &sink)
        .run_audit(now - Duration::days(7), now)
        .await
        .unwrap();

    assert!((record.metrics.avg_genres_per_user - 3.0).abs() < 1e-9);
    let genre: Vec<&BiasAlert> = record.alerts_of(AlertType::GenreConcentration).collect();
    assert_eq!(genre.len(), 1);
    assert_eq!(genre[0].severity, Severity::Medium);
    assert_eq!(record.alerts.len(), 1);

    // Medium alerts stay in the audit record only.
    assert_eq!(store.audits().await[0].alerts.len(), 1);
    assert!(store.bias_alerts().await.is_empty());
    assert!(sink.alerts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rows_outside_the_window_are_ignored() {
    let store = Arc::new(InMemoryMetricsStore::new());
    let sink = Arc::new(RecordingSink::default());
    let now = Utc::now();
    log_entry(&store, now - Duration::days(30), &dominated_entry()).await;

    let record = auditor(&store, &sink)
        .run_audit(now - Duration::days(7), now)
        .await
        .unwrap();

    assert_eq!(record.metrics.total_recommendations, 0);
    assert!(record.alerts.is_empty());
    assert_eq!(store.audits().await.len(), 1);
}

#[tokio::test]
async fn dispatch_failure_does_not_fail_the_audit() {
    let store = Arc::new(InMemoryMetricsStore::new());
    let sink = Arc::new(RecordingSink {
        fail: true,
        ..RecordingSink::default()
    });
    let now = Utc::now();
    log_entry(&store, now - Duration::days(1), &dominated_entry()).await;

    let record = auditor(&store, &sink)
        .run_audit(now - Duration::days(7), now)
        .await
        .unwrap();

    assert_eq!(record.alerts.len(), 1);
    assert_eq!(store.bias_alerts().await.len(), 1);
    assert_eq!(sink.alerts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn inverted_window_is_rejected() {
    let store = Arc::new(InMemoryMetricsStore::new());
    let sink = Arc::new(RecordingSink::default());
    let now = Utc::now();

    let err = auditor(&store, &sink)
        .run_audit(now, now - Duration::days(1))
        .await
        .unwrap_err();

    assert!(matches!(err, AuditError::InvalidWindow { .. }));
    assert!(store.audits().await.is_empty());
}

#[tokio::test]
async fn report_is_read_only() {
    let store = Arc::new(InMemoryMetricsStore::new());
    let sink = Arc::new(RecordingSink::default());
    let now = Utc::now();
    log_entry(&store, now - Duration::days(1), &dominated_entry()).await;

    let text = auditor(&store, &sink)
        .generate_report(now - Duration::days(7), now)
        .await
        .unwrap();

    assert!(text.contains("Recommendations: 20 across 1 users"));
    assert!(text.contains("[high] creator_dominance"));
    assert!(store.audits().await.is_empty());
    assert!(store.bias_alerts().await.is_empty());
    assert!(sink.alerts.lock().unwrap().is_empty());
}

fn sample_alert() -> BiasAlert {
    BiasAlert {
        alert_type: AlertType::CreatorDominance,
        severity: Severity::High,
        message: "A supplied 40.0% of recommendations".to_owned(),
        recommended_action: "Cap per-creator slots.".to_owned(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn webhook_sink_posts_alert_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/bias"))
        .and(body_partial_json(json!({
            "source": "recfuse-fairness",
            "alert": { "alert_type": "creator_dominance", "severity": "high" }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let sink = WebhookAlertSink::new(format!("{}/hooks/bias", server.uri()), 5).unwrap();
    sink.dispatch(&sample_alert()).await.unwrap();
}

#[tokio::test]
async fn webhook_sink_reports_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/bias"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let sink = WebhookAlertSink::new(format!("{}/hooks/bias", server.uri()), 5).unwrap();
    let err = sink.dispatch(&sample_alert()).await.unwrap_err();
    assert!(matches!(err, AlertError::UnexpectedStatus(500)));
}
