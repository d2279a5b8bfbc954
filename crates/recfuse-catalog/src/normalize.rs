//! Helpers shared by the per-source normalizers.

use std::sync::LazyLock;

use regex::Regex;

static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));
static LEADING_ARTICLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(the|a|an) ").expect("valid regex"));

/// Normalizes a title for cross-catalog comparison.
///
/// Lowercases, collapses punctuation and whitespace runs into a single space
/// and drops a leading English article, so `"The Office (US)"` and
/// `"office us"` compare equal.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let collapsed = NON_ALNUM_RE.replace_all(&lowered, " ");
    let trimmed = collapsed.trim();
    LEADING_ARTICLE_RE.replace(trimmed, "").into_owned()
}

/// Extracts the year from a `"YYYY-MM-DD"` (or bare `"YYYY"`) date string.
#[must_use]
pub fn parse_year(date: &str) -> Option<i32> {
    let year = date.get(..4)?;
    year.parse().ok().filter(|y| *y > 1800)
}

/// Maps a 0-10 rating onto a 0-100 confidence.
#[must_use]
pub fn rating_to_confidence(rating: Option<f64>, fallback: f64) -> f64 {
    rating
        .filter(|r| r.is_finite())
        .map_or(fallback, |r| (r * 10.0).clamp(0.0, 100.0))
}

/// Drops blank entries and surrounding whitespace from catalog labels.
pub(crate) fn clean_labels<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    labels
        .into_iter()
        .filter_map(|l| {
            let l = l.as_ref().trim();
            (!l.is_empty()).then(|| l.to_owned())
        })
        .collect()
}
