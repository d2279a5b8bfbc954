//! Tertiary catalog client: free-text availability search and per-title
//! streaming sources.

use std::collections::HashSet;

use async_trait::async_trait;
use recfuse_core::{Availability, Candidate, ContentKind, Source};

use crate::error::CatalogError;
use crate::http::{CatalogHttp, CatalogHttpConfig};
use crate::normalize::normalize_title;
use crate::types::{SourceCandidate, TertiaryItem, TertiarySearchResponse, TertiarySource};
use crate::{AvailabilityLookup, CandidateQuery, CatalogSource};

/// How many platform names an [`Availability`] carries.
pub const TOP_PLATFORM_LIMIT: usize = 3;

#[derive(Debug, Clone)]
pub struct AvailabilityClient {
    http: CatalogHttp,
    api_key: Option<String>,
}

impl AvailabilityClient {
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidConfig`] for an unparsable base URL.
    pub fn new(config: &CatalogHttpConfig, api_key: Option<String>) -> Result<Self, CatalogError> {
        Ok(Self {
            http: CatalogHttp::new(config)?,
            api_key,
        })
    }

    fn params(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        self.api_key
            .iter()
            .map(|k| ("apiKey", k.clone()))
            .chain(extra.iter().cloned())
            .collect()
    }

    /// Search titles by `field` (`name`, `tmdb_movie_id`, `tmdb_tv_id`).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the request fails after retries.
    pub async fn search(
        &self,
        field: &'static str,
        value: &str,
        kind: ContentKind,
    ) -> Result<Vec<TertiaryItem>, CatalogError> {
        let types = match kind {
            ContentKind::Movie => "movie",
            ContentKind::Show => "tv",
        };
        let params = self.params(&[
            ("search_field", field.to_owned()),
            ("search_value", value.to_owned()),
            ("types", types.to_owned()),
        ]);
        let response: TertiarySearchResponse = self
            .http
            .get_json("/search/", &params, &[], "availability search")
            .await?;
        Ok(response.title_results)
    }

    /// Streaming and purchase offers for one tertiary-catalog title.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the request fails after retries.
    pub async fn sources(&self, title_id: i64) -> Result<Vec<TertiarySource>, CatalogError> {
        let params = self.params(&[]);
        let path = format!("/title/{title_id}/sources/");
        self.http
            .get_json(&path, &params, &[], "availability sources")
            .await
    }

    /// Finds the tertiary-catalog id for a canonical id, falling back to an
    /// exact (normalized) title match.
    async fn lookup_title_id(
        &self,
        canonical_id: &str,
        title: &str,
        kind: ContentKind,
    ) -> Result<Option<i64>, CatalogError> {
        let id_field = match kind {
            ContentKind::Movie => "tmdb_movie_id",
            ContentKind::Show => "tmdb_tv_id",
        };
        if let Some(hit) = self.search(id_field, canonical_id, kind).await?.first() {
            return Ok(Some(hit.id));
        }

        let wanted = normalize_title(title);
        if wanted.is_empty() {
            return Ok(None);
        }
        let by_name = self.search("name", title, kind).await?;
        Ok(by_name
            .iter()
            .find(|item| normalize_title(&item.name) == wanted)
            .map(|item| item.id))
    }
}

/// Collapses raw offers into an [`Availability`] summary.
///
/// Platforms are de-duplicated by name; monetized platforms are listed
/// first in [`Availability::top_platforms`].
#[must_use]
pub fn summarize_sources(sources: &[TertiarySource]) -> Availability {
    let mut seen = HashSet::new();
    let mut monetized = Vec::new();
    let mut other = Vec::new();
    for source in sources {
        let name = source.name.trim();
        if name.is_empty() || !seen.insert(name.to_lowercase()) {
            continue;
        }
        if source.is_monetized() {
            monetized.push(name.to_owned());
        } else {
            other.push(name.to_owned());
        }
    }
    let monetized_platforms = u32::try_from(monetized.len()).unwrap_or(u32::MAX);
    let platform_count = u32::try_from(seen.len()).unwrap_or(u32::MAX);
    let top_platforms = monetized
        .into_iter()
        .chain(other)
        .take(TOP_PLATFORM_LIMIT)
        .collect();
    Availability {
        platform_count,
        top_platforms,
        monetized_platforms,
    }
}

#[async_trait]
impl CatalogSource for AvailabilityClient {
    fn source(&self) -> Source {
        Source::Tertiary
    }

    /// Free-text search; a query without text yields no candidates.
    async fn fetch_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<Candidate>, CatalogError> {
        let Some(text) = query.text.as_deref() else {
            tracing::debug!("no free-text query, skipping availability search");
            return Ok(Vec::new());
        };
        let items = self.search("name", text, query.kind).await?;
        Ok(items
            .into_iter()
            .filter_map(|item| SourceCandidate::Tertiary(item).normalize(query))
            .take(query.limit)
            .collect())
    }
}

#[async_trait]
impl AvailabilityLookup for AvailabilityClient {
    async fn get_availability(
        &self,
        canonical_id: &str,
        title: &str,
        kind: ContentKind,
    ) -> Result<Availability, CatalogError> {
        let Some(title_id) = self.lookup_title_id(canonical_id, title, kind).await? else {
            tracing::debug!(canonical_id, title, "title unknown to availability catalog");
            return Ok(Availability::default());
        };
        let sources = self.sources(title_id).await?;
        Ok(summarize_sources(&sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(name: &str, offer_type: &str) -> TertiarySource {
        TertiarySource {
            name: name.to_owned(),
            offer_type: offer_type.to_owned(),
            region: Some("US".to_owned()),
        }
    }

    #[test]
    fn summarize_dedupes_and_orders_monetized_first() {
        let availability = summarize_sources(&[
            offer("iTunes", "buy"),
            offer("Netflix", "sub"),
            offer("netflix", "sub"),
            offer("Tubi", "free"),
            offer("Amazon", "rent"),
        ]);
        assert_eq!(availability.platform_count, 4);
        assert_eq!(availability.monetized_platforms, 2);
        assert_eq!(
            availability.top_platforms,
            vec!["Netflix".to_owned(), "Tubi".to_owned(), "iTunes".to_owned()]
        );
    }

    #[test]
    fn summarize_empty_is_default() {
        assert_eq!(summarize_sources(&[]), Availability::default());
    }
}
