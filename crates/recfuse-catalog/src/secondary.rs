//! Secondary catalog client: trending lists filtered by genre.

use async_trait::async_trait;
use recfuse_core::{Candidate, ContentKind, Source};

use crate::error::CatalogError;
use crate::http::{CatalogHttp, CatalogHttpConfig};
use crate::types::{SecondaryEntry, SourceCandidate};
use crate::{CandidateQuery, CatalogSource};

const API_VERSION: &str = "2";

#[derive(Debug, Clone)]
pub struct SecondaryCatalogClient {
    http: CatalogHttp,
    client_id: Option<String>,
}

impl SecondaryCatalogClient {
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidConfig`] for an unparsable base URL.
    pub fn new(
        config: &CatalogHttpConfig,
        client_id: Option<String>,
    ) -> Result<Self, CatalogError> {
        Ok(Self {
            http: CatalogHttp::new(config)?,
            client_id,
        })
    }

    /// Currently trending titles of `kind`, optionally restricted to genres.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the request fails after retries or the
    /// body is not a trending list.
    pub async fn trending(
        &self,
        kind: ContentKind,
        genres: &[String],
        limit: usize,
    ) -> Result<Vec<SecondaryEntry>, CatalogError> {
        let path = match kind {
            ContentKind::Movie => "/movies/trending",
            ContentKind::Show => "/shows/trending",
        };
        let mut params = vec![("extended", "full".to_owned()), ("limit", limit.to_string())];
        if !genres.is_empty() {
            let slugs: Vec<String> = genres.iter().map(|g| genre_slug(g)).collect();
            params.push(("genres", slugs.join(",")));
        }
        let mut headers = vec![("trakt-api-version", API_VERSION.to_owned())];
        if let Some(id) = &self.client_id {
            headers.push(("trakt-api-key", id.clone()));
        }
        self.http
            .get_json(path, &params, &headers, "secondary trending")
            .await
    }
}

/// `"Science Fiction"` → `"science-fiction"`.
fn genre_slug(genre: &str) -> String {
    genre
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[async_trait]
impl CatalogSource for SecondaryCatalogClient {
    fn source(&self) -> Source {
        Source::Secondary
    }

    async fn fetch_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<Candidate>, CatalogError> {
        let entries = self
            .trending(query.kind, &query.genres, query.limit)
            .await?;
        let candidates: Vec<Candidate> = entries
            .into_iter()
            .filter_map(|entry| SourceCandidate::Secondary(entry).normalize(query))
            .take(query.limit)
            .collect();
        tracing::debug!(kept = candidates.len(), "secondary catalog trending complete");
        Ok(candidates)
    }
}
