//! HTTP adapters for the three content catalogs consumed by the Fusion Engine.
//!
//! Each adapter speaks its catalog's own wire format (see [`types`]) and
//! normalizes every item into a [`Candidate`] at the boundary, so nothing
//! downstream ever sees a source-specific field.

pub mod availability;
pub mod error;
mod http;
pub mod normalize;
pub mod primary;
mod retry;
pub mod secondary;
pub mod types;

use async_trait::async_trait;
use recfuse_core::{Availability, Candidate, ContentKind, Source, UserPreferences};

pub use availability::AvailabilityClient;
pub use error::CatalogError;
pub use http::CatalogHttpConfig;
pub use normalize::normalize_title;
pub use primary::PrimaryCatalogClient;
pub use secondary::SecondaryCatalogClient;
pub use types::SourceCandidate;

/// Source-agnostic description of what to fetch from a catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateQuery {
    pub genres: Vec<String>,
    pub networks: Vec<String>,
    pub kind: ContentKind,
    /// Free text for catalogs that search by title.
    pub text: Option<String>,
    /// Upper bound on candidates returned by one adapter.
    pub limit: usize,
}

impl CandidateQuery {
    #[must_use]
    pub fn from_preferences(prefs: &UserPreferences, limit: usize) -> Self {
        Self {
            genres: prefs.favorite_genres.clone(),
            networks: prefs.preferred_networks.clone(),
            kind: prefs.kind,
            text: prefs
                .query
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_owned),
            limit,
        }
    }

    /// First favorite genre (case-insensitive) carried by `genres`.
    #[must_use]
    pub fn matched_genre<'a>(&self, genres: &'a [String]) -> Option<&'a str> {
        genres
            .iter()
            .find(|g| self.genres.iter().any(|fav| fav.eq_ignore_ascii_case(g)))
            .map(String::as_str)
    }
}

/// A catalog that proposes candidates for a user.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn source(&self) -> Source;

    /// Fetch at most `query.limit` normalized candidates.
    async fn fetch_candidates(&self, query: &CandidateQuery)
        -> Result<Vec<Candidate>, CatalogError>;
}

/// Maps a title onto the canonical (primary catalog) identifier.
#[async_trait]
pub trait TitleResolver: Send + Sync {
    /// `Ok(None)` when the catalog has no confident match.
    async fn resolve_id(
        &self,
        title: &str,
        kind: ContentKind,
    ) -> Result<Option<String>, CatalogError>;
}

/// Looks up where a title can be watched.
#[async_trait]
pub trait AvailabilityLookup: Send + Sync {
    async fn get_availability(
        &self,
        canonical_id: &str,
        title: &str,
        kind: ContentKind,
    ) -> Result<Availability, CatalogError>;
}
