mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use recfuse_aggregator::{Aggregator, AggregatorConfig};
use recfuse_core::{MetricsSink, MetricsStore, TracingMetricsSink};
use recfuse_db::{PgBehaviorLog, PgMetricsStore};
use recfuse_fairness::{AlertSink, Auditor, TracingAlertSink, WebhookAlertSink};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

/// How long shutdown waits for an in-flight aggregation to record its run.
const AGGREGATION_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(recfuse_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting recfuse-server");

    let pool_config = recfuse_db::PoolConfig::from_app_config(&config);
    let pool = recfuse_db::connect_pool(&config.database_url, pool_config).await?;
    recfuse_db::run_migrations(&pool).await?;

    let store: Arc<dyn MetricsStore> = Arc::new(PgMetricsStore::new(pool.clone()));
    let sink: Arc<dyn MetricsSink> = Arc::new(TracingMetricsSink);
    let behavior = Arc::new(PgBehaviorLog::new(
        pool.clone(),
        config.agg_active_window_days,
    ));
    let aggregator = Arc::new(Aggregator::new(
        Arc::clone(&store),
        behavior,
        Arc::clone(&sink),
        AggregatorConfig::from_app_config(&config),
    ));

    let alert_sink: Arc<dyn AlertSink> = match &config.alert_webhook_url {
        Some(url) => Arc::new(WebhookAlertSink::new(
            url.clone(),
            config.catalog_timeout_secs,
        )?),
        None => Arc::new(TracingAlertSink),
    };
    let auditor = Arc::new(Auditor::new(store, alert_sink, sink));

    let cancel = CancellationToken::new();
    let scheduler = scheduler::build_scheduler(
        Arc::clone(&aggregator),
        auditor,
        &config,
        cancel.clone(),
    )
    .await?;

    let app = build_app(AppState { pool, aggregator });
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            cancel.cancel();
        })
        .await?;

    scheduler.shutdown(AGGREGATION_GRACE).await?;
    tracing::info!("recfuse-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, cancelling in-flight work");
}
