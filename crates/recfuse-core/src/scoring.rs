//! Tunable scoring weights for the Fusion Engine.
//!
//! Loaded from YAML so operators can retune ranking without a deploy. Every
//! field has a default, so a partial file only overrides what it names.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Multiplier applied to a 0-10 source rating to form the base score.
    pub rating_weight: f64,
    /// Rating assumed when a source reports none.
    pub default_rating: f64,
    /// Points per unit of secondary-catalog audience (watchers).
    pub popularity_weight: f64,
    pub popularity_cap: f64,
    pub genre_match_bonus: f64,
    pub recency_bonus: f64,
    pub recency_years: i32,
    pub network_bonus: f64,
    pub streaming_bonus: f64,
    /// Added to fused confidence for every additional agreeing source.
    pub corroboration_bonus: f64,
    /// Bonus when an item shares a genre with the stored temporal profile.
    pub profile_genre_bonus: f64,
    /// Points per monetization-eligible platform found during enrichment.
    pub platform_bonus: f64,
    pub platform_bonus_cap: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            rating_weight: 7.0,
            default_rating: 5.0,
            popularity_weight: 0.02,
            popularity_cap: 20.0,
            genre_match_bonus: 15.0,
            recency_bonus: 10.0,
            recency_years: 2,
            network_bonus: 5.0,
            streaming_bonus: 5.0,
            corroboration_bonus: 10.0,
            profile_genre_bonus: 5.0,
            platform_bonus: 2.0,
            platform_bonus_cap: 10.0,
        }
    }
}

impl ScoringWeights {
    fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("rating_weight", self.rating_weight),
            ("default_rating", self.default_rating),
            ("popularity_weight", self.popularity_weight),
            ("popularity_cap", self.popularity_cap),
            ("genre_match_bonus", self.genre_match_bonus),
            ("recency_bonus", self.recency_bonus),
            ("network_bonus", self.network_bonus),
            ("streaming_bonus", self.streaming_bonus),
            ("corroboration_bonus", self.corroboration_bonus),
            ("profile_genre_bonus", self.profile_genre_bonus),
            ("platform_bonus", self.platform_bonus),
            ("platform_bonus_cap", self.platform_bonus_cap),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "scoring weight {name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.recency_years < 0 {
            return Err(ConfigError::Validation(
                "scoring weight recency_years must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load scoring weights from a YAML file.
///
/// A missing file yields [`ScoringWeights::default`].
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if any weight is negative.
pub fn load_scoring_weights(path: &Path) -> Result<ScoringWeights, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "scoring file not found; using defaults");
            return Ok(ScoringWeights::default());
        }
        Err(e) => {
            return Err(ConfigError::ScoringFileIo {
                path: path.display().to_string(),
                source: e,
            })
        }
    };
    parse_scoring_weights(&content)
}

fn parse_scoring_weights(content: &str) -> Result<ScoringWeights, ConfigError> {
    let weights: ScoringWeights = serde_yaml::from_str(content)?;
    weights.validate()?;
    Ok(weights)
}
