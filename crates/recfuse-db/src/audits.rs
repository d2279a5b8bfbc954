//! Database operations for `fairness_audits` and `bias_alerts`.

use recfuse_core::{BiasAlert, FairnessAuditRecord};
use sqlx::PgPool;

use crate::DbError;

/// Appends an audit record. Metrics and alerts are stored as JSONB.
///
/// # Errors
///
/// Returns [`DbError::Json`] if serialization fails or [`DbError::Sqlx`] if
/// the insert fails.
pub async fn insert_audit_record(
    pool: &PgPool,
    record: &FairnessAuditRecord,
) -> Result<i64, DbError> {
    let metrics = serde_json::to_value(&record.metrics).map_err(|source| DbError::Json {
        column: "metrics",
        source,
    })?;
    let alerts = serde_json::to_value(&record.alerts).map_err(|source| DbError::Json {
        column: "alerts",
        source,
    })?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO fairness_audits (window_start, window_end, metrics, alerts, created_at) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id",
    )
    .bind(record.window_start)
    .bind(record.window_end)
    .bind(metrics)
    .bind(alerts)
    .bind(record.created_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Appends a single bias alert row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_bias_alert(pool: &PgPool, alert: &BiasAlert) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO bias_alerts (alert_type, severity, message, recommended_action, created_at) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id",
    )
    .bind(alert.alert_type.as_str())
    .bind(alert.severity.as_str())
    .bind(&alert.message)
    .bind(&alert.recommended_action)
    .bind(alert.created_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}
