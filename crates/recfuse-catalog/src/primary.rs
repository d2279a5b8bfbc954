//! Primary catalog client: genre discovery plus canonical-id resolution.

use async_trait::async_trait;
use recfuse_core::{Candidate, ContentKind, Source};

use crate::error::CatalogError;
use crate::http::{CatalogHttp, CatalogHttpConfig};
use crate::normalize::normalize_title;
use crate::types::{PrimaryPage, SourceCandidate};
use crate::{CandidateQuery, CatalogSource, TitleResolver};

fn kind_segment(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Movie => "movie",
        ContentKind::Show => "tv",
    }
}

#[derive(Debug, Clone)]
pub struct PrimaryCatalogClient {
    http: CatalogHttp,
    api_key: Option<String>,
}

impl PrimaryCatalogClient {
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidConfig`] for an unparsable base URL, or
    /// [`CatalogError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &CatalogHttpConfig, api_key: Option<String>) -> Result<Self, CatalogError> {
        Ok(Self {
            http: CatalogHttp::new(config)?,
            api_key,
        })
    }

    fn auth_params(&self) -> Vec<(&'static str, String)> {
        self.api_key
            .iter()
            .map(|k| ("api_key", k.clone()))
            .collect()
    }

    /// Genre-keyword discovery, most popular first.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the request fails after retries or the
    /// body is not a result page.
    pub async fn discover(&self, query: &CandidateQuery) -> Result<PrimaryPage, CatalogError> {
        let mut params = self.auth_params();
        params.push(("sort_by", "popularity.desc".to_owned()));
        if !query.genres.is_empty() {
            params.push(("with_genres", query.genres.join("|")));
        }
        if query.kind == ContentKind::Show && !query.networks.is_empty() {
            params.push(("with_networks", query.networks.join("|")));
        }
        let path = format!("/discover/{}", kind_segment(query.kind));
        self.http
            .get_json(&path, &params, &[], "primary discover")
            .await
    }

    /// Title search used by [`TitleResolver::resolve_id`].
    ///
    /// # Errors
    ///
    /// Same as [`PrimaryCatalogClient::discover`].
    pub async fn search(
        &self,
        title: &str,
        kind: ContentKind,
    ) -> Result<PrimaryPage, CatalogError> {
        let mut params = self.auth_params();
        params.push(("query", title.to_owned()));
        let path = format!("/search/{}", kind_segment(kind));
        self.http
            .get_json(&path, &params, &[], "primary search")
            .await
    }
}

#[async_trait]
impl CatalogSource for PrimaryCatalogClient {
    fn source(&self) -> Source {
        Source::Primary
    }

    async fn fetch_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<Candidate>, CatalogError> {
        let page = self.discover(query).await?;
        let total = page.results.len();
        let candidates: Vec<Candidate> = page
            .results
            .into_iter()
            .filter_map(|item| SourceCandidate::Primary(item).normalize(query))
            .take(query.limit)
            .collect();
        tracing::debug!(
            returned = total,
            kept = candidates.len(),
            "primary catalog discovery complete"
        );
        Ok(candidates)
    }
}

#[async_trait]
impl TitleResolver for PrimaryCatalogClient {
    async fn resolve_id(
        &self,
        title: &str,
        kind: ContentKind,
    ) -> Result<Option<String>, CatalogError> {
        let wanted = normalize_title(title);
        if wanted.is_empty() {
            return Ok(None);
        }
        let page = self.search(title, kind).await?;
        let found = page
            .results
            .iter()
            .find(|item| {
                item.display_title().map(normalize_title).as_deref() == Some(wanted.as_str())
            })
            .map(|item| item.id.to_string());
        if found.is_none() {
            tracing::debug!(title, candidates = page.results.len(), "no exact title match");
        }
        Ok(found)
    }
}
