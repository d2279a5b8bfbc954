//! Offline unit tests for recfuse-db row conversions.
//! These tests do not require a live database connection.

use chrono::Utc;
use recfuse_core::{AggregationRun, RunStatus, UserTemporalProfile};
use recfuse_db::profiles::ProfileRow;
use recfuse_db::runs::AggregationRunRow;
use serde_json::json;
use uuid::Uuid;

fn profile_row() -> ProfileRow {
    ProfileRow {
        user_id: "user-1".to_string(),
        avg_session_minutes: 42.5,
        total_watch_hours: 12.0,
        binge_session_count: 3,
        top_genres: vec!["drama".to_string(), "comedy".to_string()],
        preferred_hours: vec![20, 21],
        device_split: json!({"tv": 0.75, "phone": 0.25}),
        extensions: json!({"weekend_ratio": 0.4}),
        last_computed_at: Utc::now(),
    }
}

#[test]
fn profile_row_converts_to_domain_profile() {
    let profile = UserTemporalProfile::try_from(profile_row()).expect("valid row");
    assert_eq!(profile.user_id, "user-1");
    assert_eq!(profile.binge_session_count, 3);
    assert_eq!(profile.preferred_hours, vec![20, 21]);
    assert!((profile.device_split["tv"] - 0.75).abs() < 1e-9);
    assert_eq!(profile.extensions["weekend_ratio"], json!(0.4));
}

#[test]
fn profile_row_with_non_object_device_split_is_rejected() {
    let mut row = profile_row();
    row.device_split = json!(["tv"]);
    assert!(UserTemporalProfile::try_from(row).is_err());
}

#[test]
fn profile_row_with_out_of_range_hour_is_rejected() {
    let mut row = profile_row();
    row.preferred_hours = vec![-1];
    assert!(UserTemporalProfile::try_from(row).is_err());
}

#[test]
fn run_row_converts_counts_and_status() {
    let now = Utc::now();
    let row = AggregationRunRow {
        id: 7,
        public_id: Uuid::new_v4(),
        status: "cancelled".to_string(),
        started_at: now,
        completed_at: now,
        duration_ms: 1_250,
        users_processed: 1_000,
        users_skipped: 20,
        error_count: 3,
        batch_count: 1,
        concurrency_limit: 20,
        context: json!({"cancelled": true}),
        created_at: now,
    };

    let run = AggregationRun::try_from(row).expect("valid row");
    assert_eq!(run.status, RunStatus::Cancelled);
    assert_eq!(run.stats.processed, 1_000);
    assert_eq!(run.stats.skipped, 20);
    assert_eq!(run.stats.errors, 3);
    assert_eq!(run.concurrency_limit, 20);
}
