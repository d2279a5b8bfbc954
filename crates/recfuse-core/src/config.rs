use std::env::VarError;
use std::fmt::Display;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_PRIMARY_CATALOG_URL: &str = "https://api.themoviedb.org/3";
const DEFAULT_SECONDARY_CATALOG_URL: &str = "https://api.trakt.tv";
const DEFAULT_AVAILABILITY_CATALOG_URL: &str = "https://api.watchmode.com/v1";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

fn parse_var<T, F>(lookup: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Result<String, VarError>,
{
    let raw = lookup(var).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };
    let or_default =
        |var: &str, default: &str| -> String { lookup(var).unwrap_or_else(|_| default.to_string()) };
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("RECFUSE_ENV", "development"));

    let config = AppConfig {
        database_url,
        env,
        bind_addr: parse_var(&lookup, "RECFUSE_BIND_ADDR", "0.0.0.0:3000")?,
        log_level: or_default("RECFUSE_LOG_LEVEL", "info"),
        db_max_connections: parse_var(&lookup, "RECFUSE_DB_MAX_CONNECTIONS", "10")?,
        db_min_connections: parse_var(&lookup, "RECFUSE_DB_MIN_CONNECTIONS", "1")?,
        db_acquire_timeout_secs: parse_var(&lookup, "RECFUSE_DB_ACQUIRE_TIMEOUT_SECS", "10")?,

        agg_active_window_days: parse_var(&lookup, "RECFUSE_AGG_ACTIVE_WINDOW_DAYS", "90")?,
        agg_batch_size: parse_var(&lookup, "RECFUSE_AGG_BATCH_SIZE", "1000")?,
        agg_concurrency: parse_var(&lookup, "RECFUSE_AGG_CONCURRENCY", "20")?,
        agg_freshness_hours: parse_var(&lookup, "RECFUSE_AGG_FRESHNESS_HOURS", "24")?,
        agg_max_attempts: parse_var(&lookup, "RECFUSE_AGG_MAX_ATTEMPTS", "3")?,
        agg_retry_base_ms: parse_var(&lookup, "RECFUSE_AGG_RETRY_BASE_MS", "500")?,
        agg_batch_pause_ms: parse_var(&lookup, "RECFUSE_AGG_BATCH_PAUSE_MS", "100")?,
        profile_retention_days: parse_var(&lookup, "RECFUSE_PROFILE_RETENTION_DAYS", "7")?,
        log_retention_days: parse_var(&lookup, "RECFUSE_LOG_RETENTION_DAYS", "30")?,
        keep_snapshots: parse_var(&lookup, "RECFUSE_KEEP_SNAPSHOTS", "7")?,

        adapter_timeout_secs: parse_var(&lookup, "RECFUSE_ADAPTER_TIMEOUT_SECS", "4")?,
        per_source_limit: parse_var(&lookup, "RECFUSE_PER_SOURCE_LIMIT", "20")?,
        enrich_concurrency: parse_var(&lookup, "RECFUSE_ENRICH_CONCURRENCY", "8")?,
        scoring_path: or_default("RECFUSE_SCORING_PATH", "./config/scoring.yaml").into(),

        primary_catalog_url: or_default("PRIMARY_CATALOG_URL", DEFAULT_PRIMARY_CATALOG_URL),
        primary_catalog_api_key: optional("PRIMARY_CATALOG_API_KEY"),
        secondary_catalog_url: or_default("SECONDARY_CATALOG_URL", DEFAULT_SECONDARY_CATALOG_URL),
        secondary_catalog_client_id: optional("SECONDARY_CATALOG_CLIENT_ID"),
        availability_catalog_url: or_default(
            "AVAILABILITY_CATALOG_URL",
            DEFAULT_AVAILABILITY_CATALOG_URL,
        ),
        availability_catalog_api_key: optional("AVAILABILITY_CATALOG_API_KEY"),
        catalog_timeout_secs: parse_var(&lookup, "RECFUSE_CATALOG_TIMEOUT_SECS", "10")?,
        catalog_max_retries: parse_var(&lookup, "RECFUSE_CATALOG_MAX_RETRIES", "2")?,

        aggregation_cron: or_default("RECFUSE_AGGREGATION_CRON", "0 0 3 * * *"),
        audit_cron: or_default("RECFUSE_AUDIT_CRON", "0 0 4 * * SUN"),
        audit_window_days: parse_var(&lookup, "RECFUSE_AUDIT_WINDOW_DAYS", "7")?,
        alert_webhook_url: optional("RECFUSE_ALERT_WEBHOOK_URL"),
    };

    validate(&config)?;
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    let positive = [
        ("RECFUSE_AGG_BATCH_SIZE", config.agg_batch_size),
        ("RECFUSE_AGG_CONCURRENCY", config.agg_concurrency),
        ("RECFUSE_PER_SOURCE_LIMIT", config.per_source_limit),
        ("RECFUSE_ENRICH_CONCURRENCY", config.enrich_concurrency),
    ];
    for (var, value) in positive {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{var} must be at least 1")));
        }
    }
    if config.agg_max_attempts == 0 {
        return Err(ConfigError::Validation(
            "RECFUSE_AGG_MAX_ATTEMPTS must be at least 1".to_string(),
        ));
    }
    if config.agg_active_window_days <= 0 || config.audit_window_days <= 0 {
        return Err(ConfigError::Validation(
            "window lengths must be positive day counts".to_string(),
        ));
    }
    Ok(())
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
