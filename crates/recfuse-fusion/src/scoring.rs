//! Per-source candidate scoring on a 0-100 scale.

use recfuse_core::{Candidate, ScoringWeights, Source, UserPreferences};

pub const MAX_SCORE: f64 = 100.0;

/// Case-insensitive intersection test between two label lists.
pub(crate) fn overlaps(left: &[String], right: &[String]) -> bool {
    left.iter()
        .any(|l| right.iter().any(|r| r.eq_ignore_ascii_case(l)))
}

/// Base score from the source's own quality and audience signals.
fn base_score(candidate: &Candidate, weights: &ScoringWeights) -> f64 {
    let rating = candidate
        .rating
        .filter(|r| r.is_finite())
        .unwrap_or(weights.default_rating)
        .clamp(0.0, 10.0);
    let quality = rating * weights.rating_weight;
    match candidate.source {
        Source::Secondary => {
            let audience = candidate.popularity.unwrap_or(0.0).max(0.0) * weights.popularity_weight;
            quality + audience.min(weights.popularity_cap)
        }
        Source::Primary | Source::Tertiary | Source::Hybrid => quality,
    }
}

/// Scores one candidate for `prefs`, clamped to `0..=MAX_SCORE`.
#[must_use]
pub fn score_candidate(
    candidate: &Candidate,
    prefs: &UserPreferences,
    weights: &ScoringWeights,
    current_year: i32,
) -> f64 {
    let mut score = base_score(candidate, weights);

    if overlaps(&candidate.genres, &prefs.favorite_genres) {
        score += weights.genre_match_bonus;
    }
    if candidate
        .release_year
        .is_some_and(|year| current_year - year <= weights.recency_years)
    {
        score += weights.recency_bonus;
    }
    if candidate.creator.as_ref().is_some_and(|creator| {
        prefs
            .preferred_networks
            .iter()
            .any(|n| n.eq_ignore_ascii_case(creator))
    }) {
        score += weights.network_bonus;
    }
    if candidate.streaming_available {
        score += weights.streaming_bonus;
    }

    score.clamp(0.0, MAX_SCORE)
}
