//! Wire types for the three catalogs and the closed union that carries them
//! to the normalization boundary.
//!
//! Every field the catalogs treat as optional is `#[serde(default)]`; the
//! normalizers decide which gaps make an item unusable.

use serde::Deserialize;

use recfuse_core::{Candidate, Source};

use crate::normalize::{clean_labels, parse_year, rating_to_confidence};
use crate::CandidateQuery;

/// Confidence assigned when a catalog supplies no rating at all.
const UNRATED_CONFIDENCE: f64 = 50.0;

#[derive(Debug, Clone, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

// ---------------------------------------------------------------------------
// Primary catalog (genre discovery, canonical ids)
// ---------------------------------------------------------------------------

/// `{ "results": [...] }` page returned by discovery and search.
#[derive(Debug, Deserialize)]
pub struct PrimaryPage {
    #[serde(default)]
    pub results: Vec<PrimaryItem>,
}

/// A movie or show from the primary catalog. Movies carry `title` and
/// `release_date`; shows carry `name` and `first_air_date`.
#[derive(Debug, Clone, Deserialize)]
pub struct PrimaryItem {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<NamedRef>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub networks: Vec<NamedRef>,
    #[serde(default)]
    pub production_companies: Vec<NamedRef>,
}

impl PrimaryItem {
    #[must_use]
    pub fn display_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Secondary catalog (trending lists)
// ---------------------------------------------------------------------------

/// One row of a trending list: `{ "watchers": 12, "movie": {...} }` or
/// `{ "watchers": 12, "show": {...} }`.
#[derive(Debug, Clone, Deserialize)]
pub struct SecondaryEntry {
    #[serde(default)]
    pub watchers: Option<u64>,
    #[serde(rename = "movie", alias = "show")]
    pub item: SecondaryTitle,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecondaryTitle {
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub ids: SecondaryIds,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub network: Option<String>,
}

/// Cross-reference ids; `tmdb` is the primary catalog's id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecondaryIds {
    #[serde(default)]
    pub trakt: Option<i64>,
    #[serde(default)]
    pub tmdb: Option<i64>,
}

// ---------------------------------------------------------------------------
// Tertiary catalog (availability search)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TertiarySearchResponse {
    #[serde(default)]
    pub title_results: Vec<TertiaryItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TertiaryItem {
    pub id: i64,
    pub name: String,
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    /// Primary catalog id, when the tertiary catalog knows it.
    #[serde(default)]
    pub tmdb_id: Option<i64>,
    #[serde(default)]
    pub user_rating: Option<f64>,
    #[serde(default)]
    pub genre_names: Vec<String>,
    #[serde(default)]
    pub source_count: u32,
}

/// One streaming/purchase offer for a title.
#[derive(Debug, Clone, Deserialize)]
pub struct TertiarySource {
    pub name: String,
    /// `sub`, `free`, `tve`, `rent` or `buy`.
    #[serde(rename = "type")]
    pub offer_type: String,
    #[serde(default)]
    pub region: Option<String>,
}

impl TertiarySource {
    /// Subscription, free-with-ads and TV-everywhere offers.
    #[must_use]
    pub fn is_monetized(&self) -> bool {
        matches!(self.offer_type.as_str(), "sub" | "free" | "tve")
    }
}

// ---------------------------------------------------------------------------
// Closed union + normalization
// ---------------------------------------------------------------------------

/// A raw item from exactly one catalog, before normalization.
#[derive(Debug, Clone)]
pub enum SourceCandidate {
    Primary(PrimaryItem),
    Secondary(SecondaryEntry),
    Tertiary(TertiaryItem),
}

impl SourceCandidate {
    #[must_use]
    pub fn source(&self) -> Source {
        match self {
            SourceCandidate::Primary(_) => Source::Primary,
            SourceCandidate::Secondary(_) => Source::Secondary,
            SourceCandidate::Tertiary(_) => Source::Tertiary,
        }
    }

    /// Converts the raw item into the canonical [`Candidate`] shape.
    ///
    /// Returns `None` for items with no usable title; such items are
    /// permanent per-item failures and are skipped by the caller.
    #[must_use]
    pub fn normalize(self, query: &CandidateQuery) -> Option<Candidate> {
        match self {
            SourceCandidate::Primary(item) => normalize_primary(item, query),
            SourceCandidate::Secondary(entry) => normalize_secondary(entry, query),
            SourceCandidate::Tertiary(item) => normalize_tertiary(item, query),
        }
    }
}

fn normalize_primary(item: PrimaryItem, query: &CandidateQuery) -> Option<Candidate> {
    let title = item.display_title()?.to_owned();
    let genres = clean_labels(item.genres.iter().map(|g| g.name.as_str()));
    let release_year = item
        .release_date
        .as_deref()
        .or(item.first_air_date.as_deref())
        .and_then(parse_year);
    let creator = item
        .networks
        .first()
        .or(item.production_companies.first())
        .map(|r| r.name.trim().to_owned())
        .filter(|c| !c.is_empty());
    let reason = match query.matched_genre(&genres) {
        Some(genre) => format!("Matches your interest in {genre}"),
        None => match item.vote_average {
            Some(v) => format!("Highly rated ({v:.1}/10)"),
            None => "Popular in the primary catalog".to_owned(),
        },
    };
    let id = item.id.to_string();
    Some(Candidate {
        canonical_id: Some(id.clone()),
        external_id: id,
        title,
        overview: item.overview.filter(|o| !o.trim().is_empty()),
        kind: query.kind,
        genres,
        release_year,
        creator,
        rating: item.vote_average,
        popularity: item.popularity,
        streaming_available: false,
        confidence: rating_to_confidence(item.vote_average, UNRATED_CONFIDENCE),
        reason,
        source: Source::Primary,
        score: 0.0,
    })
}

#[allow(clippy::cast_precision_loss)]
fn normalize_secondary(entry: SecondaryEntry, query: &CandidateQuery) -> Option<Candidate> {
    let SecondaryEntry { watchers, item } = entry;
    let title = item.title.trim().to_owned();
    if title.is_empty() {
        return None;
    }
    let genres = clean_labels(&item.genres);
    let external_id = item
        .ids
        .trakt
        .map_or_else(|| title.clone(), |id| id.to_string());
    let reason = match (query.matched_genre(&genres), watchers) {
        (Some(genre), _) => format!("Trending in {genre}"),
        (None, Some(w)) if w > 0 => format!("Trending now ({w} watching)"),
        (None, _) => "Trending now".to_owned(),
    };
    Some(Candidate {
        canonical_id: item.ids.tmdb.map(|id| id.to_string()),
        external_id,
        title,
        overview: item.overview.filter(|o| !o.trim().is_empty()),
        kind: query.kind,
        genres,
        release_year: item.year,
        creator: item.network.filter(|n| !n.trim().is_empty()),
        rating: item.rating,
        popularity: watchers.map(|w| w as f64),
        streaming_available: false,
        confidence: rating_to_confidence(item.rating, UNRATED_CONFIDENCE),
        reason,
        source: Source::Secondary,
        score: 0.0,
    })
}

fn normalize_tertiary(item: TertiaryItem, query: &CandidateQuery) -> Option<Candidate> {
    let title = item.name.trim().to_owned();
    if title.is_empty() {
        return None;
    }
    let streaming_available = item.source_count > 0;
    let reason = match query.text.as_deref() {
        Some(text) if streaming_available => format!("Available to stream, matches \"{text}\""),
        Some(text) => format!("Matches \"{text}\""),
        None if streaming_available => "Available to stream".to_owned(),
        None => "Found in availability catalog".to_owned(),
    };
    Some(Candidate {
        canonical_id: item.tmdb_id.map(|id| id.to_string()),
        external_id: item.id.to_string(),
        title,
        overview: None,
        kind: query.kind,
        genres: clean_labels(&item.genre_names),
        release_year: item.year,
        creator: None,
        rating: item.user_rating,
        popularity: None,
        streaming_available,
        confidence: rating_to_confidence(item.user_rating, UNRATED_CONFIDENCE),
        reason,
        source: Source::Tertiary,
        score: 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drama_query() -> CandidateQuery {
        CandidateQuery {
            genres: vec!["Drama".to_owned()],
            limit: 10,
            ..CandidateQuery::default()
        }
    }

    #[test]
    fn primary_show_uses_name_and_first_air_date() {
        let item: PrimaryItem = serde_json::from_value(serde_json::json!({
            "id": 1396,
            "name": "Breaking Bad",
            "first_air_date": "2008-01-20",
            "vote_average": 8.9,
            "genres": [{ "name": "Drama" }, { "name": "Crime" }],
            "networks": [{ "name": "AMC" }]
        }))
        .unwrap();
        let c = SourceCandidate::Primary(item)
            .normalize(&drama_query())
            .unwrap();
        assert_eq!(c.canonical_id.as_deref(), Some("1396"));
        assert_eq!(c.title, "Breaking Bad");
        assert_eq!(c.release_year, Some(2008));
        assert_eq!(c.creator.as_deref(), Some("AMC"));
        assert_eq!(c.reason, "Matches your interest in Drama");
        assert!((c.confidence - 89.0).abs() < 1e-9);
    }

    #[test]
    fn primary_without_title_is_dropped() {
        let item: PrimaryItem =
            serde_json::from_value(serde_json::json!({ "id": 7, "title": "  " })).unwrap();
        assert!(SourceCandidate::Primary(item)
            .normalize(&drama_query())
            .is_none());
    }

    #[test]
    fn secondary_show_key_deserializes_via_alias() {
        let entry: SecondaryEntry = serde_json::from_value(serde_json::json!({
            "watchers": 42,
            "show": {
                "title": "Severance",
                "year": 2022,
                "ids": { "trakt": 154_997, "tmdb": 95396 },
                "genres": ["Sci-Fi"],
                "rating": 8.4,
                "network": "Apple TV+"
            }
        }))
        .unwrap();
        let c = SourceCandidate::Secondary(entry)
            .normalize(&drama_query())
            .unwrap();
        assert_eq!(c.canonical_id.as_deref(), Some("95396"));
        assert_eq!(c.external_id, "154997");
        assert_eq!(c.popularity, Some(42.0));
        assert_eq!(c.reason, "Trending now (42 watching)");
        assert_eq!(c.source, Source::Secondary);
    }

    #[test]
    fn tertiary_without_tmdb_id_has_no_canonical_id() {
        let item: TertiaryItem = serde_json::from_value(serde_json::json!({
            "id": 3_173_903,
            "name": "Night Court",
            "type": "tv_series",
            "year": 2023,
            "source_count": 2
        }))
        .unwrap();
        let query = CandidateQuery {
            text: Some("court".to_owned()),
            ..drama_query()
        };
        let c = SourceCandidate::Tertiary(item).normalize(&query).unwrap();
        assert_eq!(c.canonical_id, None);
        assert!(c.streaming_available);
        assert_eq!(c.reason, "Available to stream, matches \"court\"");
        assert!((c.confidence - UNRATED_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn monetized_offer_types() {
        let offer = |t: &str| TertiarySource {
            name: "X".to_owned(),
            offer_type: t.to_owned(),
            region: None,
        };
        assert!(offer("sub").is_monetized());
        assert!(offer("free").is_monetized());
        assert!(offer("tve").is_monetized());
        assert!(!offer("rent").is_monetized());
        assert!(!offer("buy").is_monetized());
    }
}
