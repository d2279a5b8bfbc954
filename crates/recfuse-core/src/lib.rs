//! Shared domain types, configuration, and collaborator traits for the
//! recommendation pipeline.
//!
//! The Aggregator, Fusion Engine and Fairness Auditor crates all depend on
//! this crate; none of them depend on each other. The only state they share
//! is the [`MetricsStore`].

mod app_config;
pub mod audit;
mod config;
pub mod memory;
pub mod profile;
pub mod recommendation;
pub mod run;
pub mod scoring;
pub mod sink;
pub mod store;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use audit::{AlertType, BiasAlert, FairnessAuditRecord, FairnessMetrics, Severity};
pub use config::{load_app_config, load_app_config_from_env};
pub use memory::InMemoryMetricsStore;
pub use profile::{compute_profile, UserTemporalProfile, WatchSession};
pub use recommendation::{
    Availability, Candidate, ContentKind, FusedRecommendation, LoggedItem,
    RecommendationLogEntry, Source, UserPreferences, RECOMMENDATION_LOG_METHOD,
};
pub use run::{AggregationRun, AggregationRunStats, RunStatus};
pub use scoring::{load_scoring_weights, ScoringWeights};
pub use sink::{MetricsSink, NoopMetricsSink, TracingMetricsSink};
pub use store::{BehaviorLog, LogRow, MetricsStore, RetainedTable, StoreError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read scoring weights from {path}: {source}")]
    ScoringFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scoring weights: {0}")]
    ScoringFileParse(#[from] serde_yaml::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}
