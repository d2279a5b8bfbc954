//! Command handlers, called from `main` once the pool and config exist.

use std::fmt::Write as _;

use chrono::Utc;
use recfuse_aggregator::HealthReport;
use recfuse_core::{AppConfig, FusedRecommendation, UserPreferences};
use recfuse_fairness::trailing_window;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::pipeline;

/// Runs one aggregation pass. The first Ctrl-C cancels cooperatively; the
/// pass still records its partial run.
///
/// # Errors
///
/// Returns an error if the active-user set cannot be loaded or the run
/// record cannot be written.
pub(crate) async fn run_aggregate(pool: &PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let aggregator = pipeline::aggregator(pool, config);
    let cancel = CancellationToken::new();

    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("cancelling after the current batch...");
                cancel.cancel();
            }
        })
    };

    let stats = aggregator.run_aggregation(&cancel).await;
    watcher.abort();
    let stats = stats?;

    let outcome = if cancel.is_cancelled() {
        "cancelled"
    } else {
        "complete"
    };
    println!(
        "aggregation {outcome}: processed={} skipped={} errors={} batches={}",
        stats.processed, stats.skipped, stats.errors, stats.batches
    );
    Ok(())
}

/// Prints aggregation health from the latest run record.
///
/// # Errors
///
/// Returns an error if the latest run cannot be read.
pub(crate) async fn run_health(
    pool: &PgPool,
    config: &AppConfig,
    json: bool,
) -> anyhow::Result<()> {
    let report = pipeline::aggregator(pool, config)
        .check_health(Utc::now())
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print!("{}", health_summary(&report));
    Ok(())
}

fn health_summary(report: &HealthReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "status: {}", report.status);
    if let (Some(id), Some(status)) = (report.last_run_id, report.last_run_status) {
        let _ = writeln!(out, "last run: {id} ({status})");
    }
    if let Some(completed_at) = report.last_run_completed_at {
        let _ = writeln!(
            out,
            "completed: {}",
            completed_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    if let Some(rate) = report.error_rate {
        let _ = writeln!(out, "error rate: {:.2}%", rate * 100.0);
    }
    for issue in &report.issues {
        let _ = writeln!(out, "- {issue}");
    }
    out
}

/// Runs and persists a fairness audit over the trailing `days`.
///
/// # Errors
///
/// Returns an error if the log cannot be read or the audit cannot be stored.
pub(crate) async fn run_audit(
    pool: &PgPool,
    config: &AppConfig,
    days: i64,
) -> anyhow::Result<()> {
    anyhow::ensure!(days > 0, "--days must be positive");
    let (start, end) = trailing_window(days, Utc::now());
    let record = pipeline::auditor(pool, config)?.run_audit(start, end).await?;

    println!(
        "audit complete: {} recommendations, {} users, {} alerts",
        record.metrics.total_recommendations,
        record.metrics.distinct_users,
        record.alerts.len()
    );
    for alert in &record.alerts {
        println!("[{}] {}: {}", alert.severity, alert.alert_type, alert.message);
    }
    Ok(())
}

/// Prints the fairness report over the trailing `days` without persisting.
///
/// # Errors
///
/// Returns an error if the log cannot be read.
pub(crate) async fn run_report(
    pool: &PgPool,
    config: &AppConfig,
    days: i64,
) -> anyhow::Result<()> {
    anyhow::ensure!(days > 0, "--days must be positive");
    let (start, end) = trailing_window(days, Utc::now());
    let text = pipeline::auditor(pool, config)?
        .generate_report(start, end)
        .await?;
    print!("{text}");
    Ok(())
}

/// Fetches and prints fused recommendations.
///
/// # Errors
///
/// Returns an error if the scoring file or catalog configuration is invalid,
/// or the preferences are rejected.
pub(crate) async fn run_recommend(
    pool: &PgPool,
    config: &AppConfig,
    prefs: &UserPreferences,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let engine = pipeline::fusion_engine(pool, config)?;
    let items = engine.get_recommendations(prefs, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    if items.is_empty() {
        println!("no recommendations for {}", prefs.user_id);
        return Ok(());
    }

    println!("{:<4}{:<8}{:<10}{:<42}WHY", "#", "SCORE", "SOURCE", "TITLE");
    for (rank, item) in items.iter().enumerate() {
        println!(
            "{:<4}{:<8.1}{:<10}{:<42}{}",
            rank + 1,
            item.score,
            item.source.as_str(),
            display_title(item),
            item.reasons
        );
    }
    Ok(())
}

const TITLE_WIDTH: usize = 40;

fn display_title(item: &FusedRecommendation) -> String {
    let title = match item.release_year {
        Some(year) => format!("{} ({year})", item.title),
        None => item.title.clone(),
    };
    if title.chars().count() > TITLE_WIDTH {
        format!(
            "{}...",
            title.chars().take(TITLE_WIDTH - 3).collect::<String>()
        )
    } else {
        title
    }
}
