//! Plain-text audit report.

use std::fmt::Write as _;

use recfuse_core::FairnessAuditRecord;

use crate::alerts::{
    MAX_CREATOR_SHARE, MAX_DEMOGRAPHIC_VARIANCE, MIN_CONTENT_AGE_BALANCE, MIN_EXPLORATION_SCORE,
    MIN_GENRES_PER_USER,
};

/// Creators listed in the report.
const TOP_CREATORS: usize = 5;

fn flag(violated: bool) -> &'static str {
    if violated {
        "  [FLAGGED]"
    } else {
        ""
    }
}

/// Renders an audit record as a human-readable report.
#[must_use]
pub fn render_report(record: &FairnessAuditRecord) -> String {
    let m = &record.metrics;
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "Fairness audit report");
    let _ = writeln!(
        out,
        "Window: {} to {}",
        record.window_start.format("%Y-%m-%d %H:%M UTC"),
        record.window_end.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(
        out,
        "Recommendations: {} across {} users",
        m.total_recommendations, m.distinct_users
    );

    if m.total_recommendations == 0 {
        let _ = writeln!(out, "\nNo recommendations were logged in this window.");
        return out;
    }

    let _ = writeln!(out, "\nGenre diversity");
    let _ = writeln!(
        out,
        "  avg genres per user: {:.2} (minimum {MIN_GENRES_PER_USER}){}",
        m.avg_genres_per_user,
        flag(m.avg_genres_per_user < MIN_GENRES_PER_USER)
    );
    let _ = writeln!(out, "  diversity index: {:.3}", m.genre_diversity_index);

    let _ = writeln!(out, "\nCreator representation");
    let _ = writeln!(
        out,
        "  concentration index: {:.3}",
        m.creator_concentration_index
    );
    for (creator, share) in m.creator_shares.iter().take(TOP_CREATORS) {
        let _ = writeln!(
            out,
            "  {creator}: {:.1}%{}",
            share * 100.0,
            flag(*share > MAX_CREATOR_SHARE)
        );
    }

    let _ = writeln!(out, "\nContent age");
    let _ = writeln!(out, "  recent share: {:.1}%", m.recent_proportion * 100.0);
    let _ = writeln!(
        out,
        "  balance score: {:.3} (minimum {MIN_CONTENT_AGE_BALANCE}){}",
        m.content_age_balance,
        flag(m.content_age_balance < MIN_CONTENT_AGE_BALANCE)
    );

    let _ = writeln!(out, "\nExploration");
    let _ = writeln!(
        out,
        "  familiar share: {:.1}%",
        m.familiar_proportion * 100.0
    );
    let _ = writeln!(
        out,
        "  exploration score: {:.3} (minimum {MIN_EXPLORATION_SCORE}){}",
        m.exploration_score,
        flag(m.exploration_score < MIN_EXPLORATION_SCORE)
    );

    let _ = writeln!(out, "\nDemographic engagement");
    for (bucket, engagement) in &m.bucket_engagement {
        let _ = writeln!(out, "  {bucket}: {engagement:.3}");
    }
    let _ = writeln!(
        out,
        "  variance: {:.4} (maximum {MAX_DEMOGRAPHIC_VARIANCE}){}",
        m.demographic_variance,
        flag(m.demographic_variance > MAX_DEMOGRAPHIC_VARIANCE)
    );

    let _ = writeln!(out, "\nAlerts ({})", record.alerts.len());
    if record.alerts.is_empty() {
        let _ = writeln!(out, "  none");
    }
    for alert in &record.alerts {
        let _ = writeln!(
            out,
            "  [{}] {}: {}",
            alert.severity, alert.alert_type, alert.message
        );
        let _ = writeln!(out, "    action: {}", alert.recommended_action);
    }

    out
}
