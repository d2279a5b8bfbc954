//! Candidate and fused-recommendation types shared by the catalog adapters,
//! the Fusion Engine, and the Fairness Auditor.

use serde::{Deserialize, Serialize};

/// Log method name under which every Fusion Engine response is recorded.
pub const RECOMMENDATION_LOG_METHOD: &str = "get_recommendations";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Primary,
    Secondary,
    Tertiary,
    /// Two or more catalogs proposed the same canonical item.
    Hybrid,
}

impl Source {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Primary => "primary",
            Source::Secondary => "secondary",
            Source::Tertiary => "tertiary",
            Source::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Movie,
    Show,
}

impl ContentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::Show => "show",
        }
    }
}

/// What a caller asks the Fusion Engine for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: String,
    pub favorite_genres: Vec<String>,
    pub preferred_networks: Vec<String>,
    pub kind: ContentKind,
    /// Free-text query used against the availability catalog.
    pub query: Option<String>,
    pub demographic_bucket: Option<String>,
}

/// One source's normalized opinion about one content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Cross-source key; `None` until resolved against the primary catalog.
    pub canonical_id: Option<String>,
    /// The item's id in the catalog that produced it.
    pub external_id: String,
    pub title: String,
    pub overview: Option<String>,
    pub kind: ContentKind,
    pub genres: Vec<String>,
    pub release_year: Option<i32>,
    /// Network, studio or platform credited with the item.
    pub creator: Option<String>,
    /// Source quality signal on a 0-10 scale.
    pub rating: Option<f64>,
    /// Source audience signal (watchers, vote count); scale is source-specific.
    pub popularity: Option<f64>,
    pub streaming_available: bool,
    /// 0-100.
    pub confidence: f64,
    pub reason: String,
    pub source: Source,
    /// Per-source score on 0-100, filled in by the Fusion Engine.
    pub score: f64,
}

/// Where an item can be watched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub platform_count: u32,
    pub top_platforms: Vec<String>,
    /// Platforms offering the title by subscription or free with ads.
    pub monetized_platforms: u32,
}

/// Deduplicated, merged and scored unit returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedRecommendation {
    pub canonical_id: String,
    pub title: String,
    pub overview: Option<String>,
    pub kind: ContentKind,
    pub genres: Vec<String>,
    pub release_year: Option<i32>,
    pub creator: Option<String>,
    pub confidence: f64,
    /// Distinct candidate reasons joined by [`FusedRecommendation::REASON_DELIMITER`].
    pub reasons: String,
    pub source: Source,
    pub availability: Option<Availability>,
    pub score: f64,
}

impl FusedRecommendation {
    pub const REASON_DELIMITER: &'static str = " | ";
}

/// Payload stored under [`RECOMMENDATION_LOG_METHOD`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationLogEntry {
    pub user_id: String,
    pub demographic_bucket: Option<String>,
    pub items: Vec<LoggedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedItem {
    pub canonical_id: String,
    pub genres: Vec<String>,
    pub creator: Option<String>,
    pub release_year: Option<i32>,
    pub score: f64,
    pub source: Source,
    /// No genre overlap with what the user already watches or asked for.
    pub novel: bool,
}
