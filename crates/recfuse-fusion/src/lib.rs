//! Fusion Engine: fans out to the catalog adapters, scores and merges their
//! candidates, enriches the survivors with availability and returns a ranked,
//! deduplicated list.
//!
//! Source failures degrade the result instead of failing the call. Every
//! response is logged to the Metrics Store for the Fairness Auditor.

pub mod merge;
pub mod scoring;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Datelike, Utc};
use futures::stream::{self, StreamExt};
use recfuse_catalog::{
    AvailabilityClient, AvailabilityLookup, CandidateQuery, CatalogError, CatalogHttpConfig,
    CatalogSource, PrimaryCatalogClient, SecondaryCatalogClient, TitleResolver,
};
use recfuse_core::{
    AppConfig, Candidate, FusedRecommendation, LogRow, LoggedItem, MetricsSink, MetricsStore,
    RecommendationLogEntry, ScoringWeights, UserPreferences, UserTemporalProfile,
    RECOMMENDATION_LOG_METHOD,
};
use thiserror::Error;

pub use merge::fuse_candidates;
pub use scoring::score_candidate;

use scoring::overlaps;

#[derive(Debug, Error)]
pub enum FusionError {
    #[error("invalid preferences: {0}")]
    InvalidPreferences(String),
}

#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// Budget for one adapter call, including id resolution.
    pub adapter_timeout: Duration,
    pub per_source_limit: usize,
    pub enrich_concurrency: usize,
    pub weights: ScoringWeights,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            adapter_timeout: Duration::from_secs(4),
            per_source_limit: 20,
            enrich_concurrency: 8,
            weights: ScoringWeights::default(),
        }
    }
}

impl FusionConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig, weights: ScoringWeights) -> Self {
        Self {
            adapter_timeout: Duration::from_secs(config.adapter_timeout_secs),
            per_source_limit: config.per_source_limit,
            enrich_concurrency: config.enrich_concurrency,
            weights,
        }
    }
}

/// The external catalogs the engine reads from.
#[derive(Clone)]
pub struct CatalogSet {
    pub primary: Arc<dyn CatalogSource>,
    pub secondary: Arc<dyn CatalogSource>,
    pub tertiary: Arc<dyn CatalogSource>,
    pub resolver: Arc<dyn TitleResolver>,
    pub availability: Arc<dyn AvailabilityLookup>,
}

impl CatalogSet {
    /// HTTP clients for the three configured catalogs. The primary catalog
    /// also resolves canonical ids; the availability catalog doubles as the
    /// tertiary source.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidConfig`] for an unparsable base URL.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, CatalogError> {
        let http = |base_url: &str| CatalogHttpConfig {
            base_url: base_url.to_owned(),
            timeout_secs: config.catalog_timeout_secs,
            max_retries: config.catalog_max_retries,
        };
        let primary = Arc::new(PrimaryCatalogClient::new(
            &http(&config.primary_catalog_url),
            config.primary_catalog_api_key.clone(),
        )?);
        let secondary = Arc::new(SecondaryCatalogClient::new(
            &http(&config.secondary_catalog_url),
            config.secondary_catalog_client_id.clone(),
        )?);
        let availability = Arc::new(AvailabilityClient::new(
            &http(&config.availability_catalog_url),
            config.availability_catalog_api_key.clone(),
        )?);
        Ok(Self {
            primary: primary.clone(),
            secondary,
            tertiary: availability.clone(),
            resolver: primary,
            availability,
        })
    }
}

pub struct FusionEngine {
    catalogs: CatalogSet,
    store: Arc<dyn MetricsStore>,
    sink: Arc<dyn MetricsSink>,
    config: FusionConfig,
}

impl FusionEngine {
    #[must_use]
    pub fn new(
        catalogs: CatalogSet,
        store: Arc<dyn MetricsStore>,
        sink: Arc<dyn MetricsSink>,
        config: FusionConfig,
    ) -> Self {
        Self {
            catalogs,
            store,
            sink,
            config,
        }
    }

    /// Ranked, deduplicated recommendations for `prefs`, at most `limit`.
    ///
    /// Adapter, resolution and enrichment failures are logged and absorbed;
    /// when every adapter fails the result is an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::InvalidPreferences`] when `prefs.user_id` is blank.
    pub async fn get_recommendations(
        &self,
        prefs: &UserPreferences,
        limit: usize,
    ) -> Result<Vec<FusedRecommendation>, FusionError> {
        if prefs.user_id.trim().is_empty() {
            return Err(FusionError::InvalidPreferences(
                "user_id must not be empty".to_owned(),
            ));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let timer = Instant::now();
        let query = CandidateQuery::from_preferences(prefs, self.config.per_source_limit);

        let (primary, secondary, tertiary, profile) = tokio::join!(
            self.fetch_source(self.catalogs.primary.as_ref(), &query),
            self.fetch_source(self.catalogs.secondary.as_ref(), &query),
            self.fetch_source(self.catalogs.tertiary.as_ref(), &query),
            self.load_profile(&prefs.user_id),
        );

        let current_year = Utc::now().year();
        let weights = &self.config.weights;
        let scored = primary
            .into_iter()
            .chain(secondary)
            .chain(tertiary)
            .map(|mut candidate| {
                candidate.score = score_candidate(&candidate, prefs, weights, current_year);
                candidate
            });
        let mut fused = fuse_candidates(scored, weights.corroboration_bonus);

        let profile_genres = profile.map(|p| p.top_genres).unwrap_or_default();
        if !profile_genres.is_empty() {
            for item in &mut fused {
                if overlaps(&item.genres, &profile_genres) {
                    item.score += weights.profile_genre_bonus;
                }
            }
        }

        let mut ranked = self.enrich(fused).await;
        // Stable: equal scores keep first-appearance order.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(limit);

        self.log_response(prefs, &profile_genres, &ranked).await;

        let elapsed = u64::try_from(timer.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.sink.timing_ms("fusion.request", elapsed);
        self.sink
            .increment("fusion.items_returned", ranked.len() as u64);
        tracing::info!(
            user_id = %prefs.user_id,
            returned = ranked.len(),
            limit,
            elapsed_ms = elapsed,
            "recommendations served"
        );
        Ok(ranked)
    }

    /// One adapter pass with id resolution, bounded by the adapter timeout.
    /// Failures yield an empty list.
    async fn fetch_source(
        &self,
        source: &dyn CatalogSource,
        query: &CandidateQuery,
    ) -> Vec<Candidate> {
        let label = source.source().as_str();
        let pass = async {
            let candidates = source.fetch_candidates(query).await?;
            Ok::<_, CatalogError>(self.resolve_missing_ids(candidates).await)
        };

        match tokio::time::timeout(self.config.adapter_timeout, pass).await {
            Ok(Ok(candidates)) => {
                self.sink.increment("fusion.adapter.ok", 1);
                tracing::debug!(
                    source = label,
                    candidates = candidates.len(),
                    "adapter pass complete"
                );
                candidates
            }
            Ok(Err(err)) => {
                self.sink.increment("fusion.adapter.failed", 1);
                tracing::warn!(source = label, error = %err, "catalog adapter failed, degrading");
                Vec::new()
            }
            Err(_) => {
                self.sink.increment("fusion.adapter.timeout", 1);
                let err = CatalogError::Timeout(self.config.adapter_timeout);
                tracing::warn!(
                    source = label,
                    error = %err,
                    "catalog adapter timed out, degrading"
                );
                Vec::new()
            }
        }
    }

    /// Resolves canonical ids against the primary catalog for candidates that
    /// lack one. Unresolvable candidates are dropped.
    async fn resolve_missing_ids(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let resolver = self.catalogs.resolver.as_ref();
        stream::iter(candidates)
            .map(|mut candidate| async move {
                if candidate.canonical_id.is_some() {
                    return Some(candidate);
                }
                match resolver.resolve_id(&candidate.title, candidate.kind).await {
                    Ok(Some(id)) => {
                        candidate.canonical_id = Some(id);
                        Some(candidate)
                    }
                    Ok(None) => {
                        tracing::debug!(title = %candidate.title, "no canonical id, dropping");
                        None
                    }
                    Err(err) => {
                        tracing::warn!(
                            title = %candidate.title,
                            error = %err,
                            "canonical id resolution failed, dropping"
                        );
                        None
                    }
                }
            })
            .buffered(self.config.enrich_concurrency.max(1))
            .filter_map(|resolved| async move { resolved })
            .collect()
            .await
    }

    async fn load_profile(&self, user_id: &str) -> Option<UserTemporalProfile> {
        match self.store.get_profile(user_id).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(user_id, error = %err, "temporal profile unavailable");
                None
            }
        }
    }

    /// Attaches availability and the platform bonus. Order is preserved.
    async fn enrich(&self, items: Vec<FusedRecommendation>) -> Vec<FusedRecommendation> {
        let lookup = self.catalogs.availability.as_ref();
        let weights = &self.config.weights;
        let budget = self.config.adapter_timeout;
        stream::iter(items)
            .map(|mut item| async move {
                let result = tokio::time::timeout(
                    budget,
                    lookup.get_availability(&item.canonical_id, &item.title, item.kind),
                )
                .await;
                match result {
                    Ok(Ok(availability)) => {
                        let bonus = f64::from(availability.monetized_platforms)
                            * weights.platform_bonus;
                        item.score += bonus.min(weights.platform_bonus_cap);
                        item.availability = Some(availability);
                    }
                    Ok(Err(err)) => {
                        tracing::warn!(
                            canonical_id = %item.canonical_id,
                            error = %err,
                            "availability lookup failed"
                        );
                    }
                    Err(_) => {
                        tracing::warn!(
                            canonical_id = %item.canonical_id,
                            "availability lookup timed out"
                        );
                    }
                }
                item
            })
            .buffered(self.config.enrich_concurrency.max(1))
            .collect()
            .await
    }

    async fn log_response(
        &self,
        prefs: &UserPreferences,
        profile_genres: &[String],
        items: &[FusedRecommendation],
    ) {
        let entry = RecommendationLogEntry {
            user_id: prefs.user_id.clone(),
            demographic_bucket: prefs.demographic_bucket.clone(),
            items: items
                .iter()
                .map(|item| LoggedItem {
                    canonical_id: item.canonical_id.clone(),
                    genres: item.genres.clone(),
                    creator: item.creator.clone(),
                    release_year: item.release_year,
                    score: item.score,
                    source: item.source,
                    novel: is_novel(&item.genres, &prefs.favorite_genres, profile_genres),
                })
                .collect(),
        };
        let payload = match serde_json::to_value(&entry) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode recommendation log entry");
                return;
            }
        };
        let row = LogRow {
            method: RECOMMENDATION_LOG_METHOD.to_owned(),
            user_id: Some(prefs.user_id.clone()),
            logged_at: Utc::now(),
            payload,
        };
        if let Err(err) = self.store.append_log(&row).await {
            tracing::warn!(user_id = %prefs.user_id, error = %err, "failed to log recommendations");
        }
    }
}

/// An item is novel when it has genres and none of them is a favorite or a
/// profile genre.
fn is_novel(genres: &[String], favorites: &[String], profile_genres: &[String]) -> bool {
    !genres.is_empty() && !overlaps(genres, favorites) && !overlaps(genres, profile_genres)
}
