use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,

    // Nightly aggregation
    pub agg_active_window_days: i64,
    pub agg_batch_size: usize,
    pub agg_concurrency: usize,
    pub agg_freshness_hours: i64,
    pub agg_max_attempts: u32,
    pub agg_retry_base_ms: u64,
    pub agg_batch_pause_ms: u64,
    pub profile_retention_days: i64,
    pub log_retention_days: i64,
    pub keep_snapshots: usize,

    // Fusion
    pub adapter_timeout_secs: u64,
    pub per_source_limit: usize,
    pub enrich_concurrency: usize,
    pub scoring_path: PathBuf,

    // Catalogs
    pub primary_catalog_url: String,
    pub primary_catalog_api_key: Option<String>,
    pub secondary_catalog_url: String,
    pub secondary_catalog_client_id: Option<String>,
    pub availability_catalog_url: String,
    pub availability_catalog_api_key: Option<String>,
    pub catalog_timeout_secs: u64,
    pub catalog_max_retries: u32,

    // Scheduling and alerting
    pub aggregation_cron: String,
    pub audit_cron: String,
    pub audit_window_days: i64,
    pub alert_webhook_url: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[redacted]");
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("agg_active_window_days", &self.agg_active_window_days)
            .field("agg_batch_size", &self.agg_batch_size)
            .field("agg_concurrency", &self.agg_concurrency)
            .field("agg_freshness_hours", &self.agg_freshness_hours)
            .field("agg_max_attempts", &self.agg_max_attempts)
            .field("agg_retry_base_ms", &self.agg_retry_base_ms)
            .field("agg_batch_pause_ms", &self.agg_batch_pause_ms)
            .field("profile_retention_days", &self.profile_retention_days)
            .field("log_retention_days", &self.log_retention_days)
            .field("keep_snapshots", &self.keep_snapshots)
            .field("adapter_timeout_secs", &self.adapter_timeout_secs)
            .field("per_source_limit", &self.per_source_limit)
            .field("enrich_concurrency", &self.enrich_concurrency)
            .field("scoring_path", &self.scoring_path)
            .field("primary_catalog_url", &self.primary_catalog_url)
            .field("primary_catalog_api_key", &redact(&self.primary_catalog_api_key))
            .field("secondary_catalog_url", &self.secondary_catalog_url)
            .field(
                "secondary_catalog_client_id",
                &redact(&self.secondary_catalog_client_id),
            )
            .field("availability_catalog_url", &self.availability_catalog_url)
            .field(
                "availability_catalog_api_key",
                &redact(&self.availability_catalog_api_key),
            )
            .field("catalog_timeout_secs", &self.catalog_timeout_secs)
            .field("catalog_max_retries", &self.catalog_max_retries)
            .field("aggregation_cron", &self.aggregation_cron)
            .field("audit_cron", &self.audit_cron)
            .field("audit_window_days", &self.audit_window_days)
            .field("alert_webhook_url", &redact(&self.alert_webhook_url))
            .finish()
    }
}
