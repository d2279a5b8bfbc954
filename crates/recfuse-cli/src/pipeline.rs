//! Wires the pipeline components over a Postgres pool.

use std::sync::Arc;

use recfuse_aggregator::{Aggregator, AggregatorConfig};
use recfuse_core::{AppConfig, MetricsSink, MetricsStore, TracingMetricsSink};
use recfuse_db::{PgBehaviorLog, PgMetricsStore};
use recfuse_fairness::{AlertSink, Auditor, TracingAlertSink, WebhookAlertSink};
use recfuse_fusion::{CatalogSet, FusionConfig, FusionEngine};
use sqlx::PgPool;

fn store(pool: &PgPool) -> Arc<dyn MetricsStore> {
    Arc::new(PgMetricsStore::new(pool.clone()))
}

fn sink() -> Arc<dyn MetricsSink> {
    Arc::new(TracingMetricsSink)
}

pub(crate) fn aggregator(pool: &PgPool, config: &AppConfig) -> Aggregator {
    Aggregator::new(
        store(pool),
        Arc::new(PgBehaviorLog::new(pool.clone(), config.agg_active_window_days)),
        sink(),
        AggregatorConfig::from_app_config(config),
    )
}

pub(crate) fn auditor(pool: &PgPool, config: &AppConfig) -> anyhow::Result<Auditor> {
    let alert_sink: Arc<dyn AlertSink> = match &config.alert_webhook_url {
        Some(url) => Arc::new(WebhookAlertSink::new(
            url.clone(),
            config.catalog_timeout_secs,
        )?),
        None => Arc::new(TracingAlertSink),
    };
    Ok(Auditor::new(store(pool), alert_sink, sink()))
}

pub(crate) fn fusion_engine(pool: &PgPool, config: &AppConfig) -> anyhow::Result<FusionEngine> {
    let weights = recfuse_core::load_scoring_weights(&config.scoring_path)?;
    let catalogs = CatalogSet::from_app_config(config)?;
    Ok(FusionEngine::new(
        catalogs,
        store(pool),
        sink(),
        FusionConfig::from_app_config(config, weights),
    ))
}
