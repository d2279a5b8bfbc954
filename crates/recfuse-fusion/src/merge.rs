//! Deduplication of scored candidates into fused recommendations.

use std::collections::HashMap;

use recfuse_core::{Candidate, FusedRecommendation, Source};

/// Confidence never exceeds this after corroboration bonuses.
pub const MAX_CONFIDENCE: f64 = 100.0;

/// Merges candidates sharing a canonical id.
///
/// The output keeps first-appearance order. The first candidate for an id
/// seeds the descriptive fields; each later one takes the max confidence,
/// adds `corroboration_bonus`, appends its reason when new and tags the
/// item [`Source::Hybrid`] once a second source agrees. The fused score is
/// the best contributing candidate score. Candidates without a canonical
/// id are skipped.
#[must_use]
pub fn fuse_candidates(
    candidates: impl IntoIterator<Item = Candidate>,
    corroboration_bonus: f64,
) -> Vec<FusedRecommendation> {
    let mut fused: Vec<FusedRecommendation> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for candidate in candidates {
        let Some(canonical_id) = candidate.canonical_id.clone() else {
            tracing::debug!(title = %candidate.title, "dropping candidate without canonical id");
            continue;
        };

        if let Some(&slot) = index.get(&canonical_id) {
            absorb(&mut fused[slot], candidate, corroboration_bonus);
        } else {
            index.insert(canonical_id.clone(), fused.len());
            fused.push(seed(canonical_id, candidate));
        }
    }

    fused
}

fn seed(canonical_id: String, c: Candidate) -> FusedRecommendation {
    FusedRecommendation {
        canonical_id,
        title: c.title,
        overview: c.overview,
        kind: c.kind,
        genres: c.genres,
        release_year: c.release_year,
        creator: c.creator,
        confidence: c.confidence.clamp(0.0, MAX_CONFIDENCE),
        reasons: c.reason,
        source: c.source,
        availability: None,
        score: c.score,
    }
}

fn absorb(item: &mut FusedRecommendation, c: Candidate, corroboration_bonus: f64) {
    item.confidence =
        (item.confidence.max(c.confidence) + corroboration_bonus).clamp(0.0, MAX_CONFIDENCE);

    let reason = c.reason.trim();
    let known = item
        .reasons
        .split(FusedRecommendation::REASON_DELIMITER)
        .any(|existing| existing == reason);
    if !reason.is_empty() && !known {
        if !item.reasons.is_empty() {
            item.reasons.push_str(FusedRecommendation::REASON_DELIMITER);
        }
        item.reasons.push_str(reason);
    }

    if c.source != item.source {
        item.source = Source::Hybrid;
    }
    item.score = item.score.max(c.score);

    // Fill descriptive gaps only; first-seen values win.
    if item.overview.is_none() {
        item.overview = c.overview;
    }
    if item.release_year.is_none() {
        item.release_year = c.release_year;
    }
    if item.creator.is_none() {
        item.creator = c.creator;
    }
    if item.genres.is_empty() {
        item.genres = c.genres;
    }
}
