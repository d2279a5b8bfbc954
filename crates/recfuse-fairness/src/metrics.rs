//! Distributional metrics over logged recommendation responses.

use std::collections::{BTreeMap, HashMap, HashSet};

use recfuse_core::{FairnessMetrics, LogRow, RecommendationLogEntry};

/// Items released within this many years count as recent.
pub const RECENT_YEARS: i32 = 2;
/// Target share of recent items.
pub const TARGET_RECENT_PROPORTION: f64 = 0.70;
/// Target share of familiar (non-novel) items.
pub const TARGET_FAMILIAR_PROPORTION: f64 = 0.80;
/// Bucket name for entries logged without a demographic bucket.
pub const UNKNOWN_BUCKET: &str = "unknown";

/// Decodes log payloads, skipping (and counting) malformed rows.
#[must_use]
pub fn decode_entries(rows: &[LogRow]) -> (Vec<RecommendationLogEntry>, usize) {
    let mut skipped = 0;
    let entries = rows
        .iter()
        .filter_map(|row| {
            match serde_json::from_value::<RecommendationLogEntry>(row.payload.clone()) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    skipped += 1;
                    tracing::warn!(
                        logged_at = %row.logged_at,
                        error = %err,
                        "skipping malformed recommendation log row"
                    );
                    None
                }
            }
        })
        .collect();
    (entries, skipped)
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Shannon entropy of `counts`, normalized by the maximum for that many
/// categories. Fewer than two categories yields 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn normalized_shannon(counts: impl IntoIterator<Item = usize>) -> f64 {
    let counts: Vec<usize> = counts.into_iter().filter(|c| *c > 0).collect();
    if counts.len() < 2 {
        return 0.0;
    }
    let total: usize = counts.iter().sum();
    let entropy: f64 = counts
        .iter()
        .map(|c| {
            let p = *c as f64 / total as f64;
            -p * p.ln()
        })
        .sum();
    entropy / (counts.len() as f64).ln()
}

/// Herfindahl index over volume shares. Uncredited volume contributes
/// nothing, so the index stays below 1 when some items name no creator.
#[must_use]
pub fn herfindahl(shares: &[(String, f64)]) -> f64 {
    shares.iter().map(|(_, s)| s * s).sum()
}

/// Population variance.
#[allow(clippy::cast_precision_loss)]
fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Computes every fairness metric for one window of log entries.
#[must_use]
pub fn compute_metrics(entries: &[RecommendationLogEntry], current_year: i32) -> FairnessMetrics {
    let items = entries.iter().flat_map(|e| e.items.iter());
    let total = entries.iter().map(|e| e.items.len()).sum::<usize>();

    // Genre diversity: distinct genres per user, and the global spread.
    let mut genres_by_user: HashMap<&str, HashSet<String>> = HashMap::new();
    let mut genre_counts: HashMap<String, usize> = HashMap::new();
    for entry in entries {
        let user_genres = genres_by_user.entry(entry.user_id.as_str()).or_default();
        for item in &entry.items {
            for genre in &item.genres {
                let key = genre.trim().to_lowercase();
                if key.is_empty() {
                    continue;
                }
                user_genres.insert(key.clone());
                *genre_counts.entry(key).or_default() += 1;
            }
        }
    }
    let distinct_users = genres_by_user.len();
    #[allow(clippy::cast_precision_loss)]
    let avg_genres_per_user = if distinct_users == 0 {
        0.0
    } else {
        genres_by_user.values().map(HashSet::len).sum::<usize>() as f64 / distinct_users as f64
    };

    // Creator representation as a share of total volume.
    let mut creator_counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut recent = 0;
    let mut dated = 0;
    let mut familiar = 0;
    for item in items {
        if let Some(creator) = item.creator.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            *creator_counts.entry(creator).or_default() += 1;
        }
        if let Some(year) = item.release_year {
            dated += 1;
            if current_year - year <= RECENT_YEARS {
                recent += 1;
            }
        }
        if !item.novel {
            familiar += 1;
        }
    }
    let mut creator_shares: Vec<(String, f64)> = creator_counts
        .into_iter()
        .map(|(name, count)| (name.to_owned(), ratio(count, total)))
        .collect();
    creator_shares.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let recent_proportion = ratio(recent, dated);
    let familiar_proportion = ratio(familiar, total);

    // Engagement per demographic bucket: mean item score on 0-1.
    let mut bucket_scores: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for entry in entries {
        let bucket = entry
            .demographic_bucket
            .clone()
            .unwrap_or_else(|| UNKNOWN_BUCKET.to_owned());
        let slot = bucket_scores.entry(bucket).or_default();
        for item in &entry.items {
            slot.0 += (item.score / 100.0).clamp(0.0, 1.0);
            slot.1 += 1;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let bucket_engagement: Vec<(String, f64)> = bucket_scores
        .into_iter()
        .filter(|(_, (_, n))| *n > 0)
        .map(|(bucket, (sum, n))| (bucket, sum / n as f64))
        .collect();
    let engagement: Vec<f64> = bucket_engagement.iter().map(|(_, e)| *e).collect();

    FairnessMetrics {
        total_recommendations: total as u64,
        distinct_users: distinct_users as u64,
        avg_genres_per_user,
        genre_diversity_index: normalized_shannon(genre_counts.into_values()),
        creator_concentration_index: herfindahl(&creator_shares),
        creator_shares,
        recent_proportion,
        content_age_balance: if dated == 0 {
            0.0
        } else {
            1.0 - (recent_proportion - TARGET_RECENT_PROPORTION).abs()
        },
        familiar_proportion,
        exploration_score: if total == 0 {
            0.0
        } else {
            1.0 - (familiar_proportion - TARGET_FAMILIAR_PROPORTION).abs()
        },
        demographic_variance: variance(&engagement),
        bucket_engagement,
    }
}

#[cfg(test)]
mod tests {
    use recfuse_core::{LoggedItem, Source};

    use super::*;

    fn item(genres: &[&str], creator: &str, year: i32, novel: bool, score: f64) -> LoggedItem {
        LoggedItem {
            canonical_id: format!("{creator}-{year}"),
            genres: genres.iter().map(|g| (*g).to_owned()).collect(),
            creator: Some(creator.to_owned()),
            release_year: Some(year),
            score,
            source: Source::Primary,
            novel,
        }
    }

    fn entry(user: &str, bucket: Option<&str>, items: Vec<LoggedItem>) -> RecommendationLogEntry {
        RecommendationLogEntry {
            user_id: user.to_owned(),
            demographic_bucket: bucket.map(str::to_owned),
            items,
        }
    }

    #[test]
    fn shannon_bounds() {
        assert!((normalized_shannon([5, 5, 5, 5]) - 1.0).abs() < 1e-9);
        assert_eq!(normalized_shannon([10]), 0.0);
        assert!(normalized_shannon([9, 1]) < 0.5);
    }

    #[test]
    fn genres_per_user_counts_distinct_genres_across_responses() {
        let entries = vec![
            entry("a", None, vec![item(&["Drama", "Crime"], "X", 2000, false, 50.0)]),
            entry("a", None, vec![item(&["drama", "Comedy"], "X", 2000, false, 50.0)]),
            entry("b", None, vec![item(&["Horror"], "Y", 2000, false, 50.0)]),
        ];
        let metrics = compute_metrics(&entries, 2026);
        assert_eq!(metrics.distinct_users, 2);
        assert!((metrics.avg_genres_per_user - 2.0).abs() < 1e-9);
    }

    #[test]
    fn creator_shares_and_concentration() {
        let entries = vec![entry(
            "a",
            None,
            vec![
                item(&["Drama"], "X", 2000, false, 50.0),
                item(&["Drama"], "X", 2000, false, 50.0),
                item(&["Drama"], "Y", 2000, false, 50.0),
                item(&["Drama"], "Z", 2000, false, 50.0),
            ],
        )];
        let metrics = compute_metrics(&entries, 2026);
        assert_eq!(metrics.creator_shares[0], ("X".to_owned(), 0.5));
        // 0.25 + 0.0625 + 0.0625
        assert!((metrics.creator_concentration_index - 0.375).abs() < 1e-9);
    }

    #[test]
    fn uncredited_items_count_toward_total_volume() {
        let mut items: Vec<LoggedItem> = (0..10)
            .map(|_| item(&["Drama"], "X", 2000, false, 50.0))
            .chain((0..10).map(|_| item(&["Drama"], "Y", 2000, false, 50.0)))
            .collect();
        for _ in 0..80 {
            let mut uncredited = item(&["Drama"], "", 2000, false, 50.0);
            uncredited.creator = None;
            items.push(uncredited);
        }
        let metrics = compute_metrics(&[entry("a", None, items)], 2026);
        assert_eq!(metrics.total_recommendations, 100);
        assert_eq!(
            metrics.creator_shares,
            vec![("X".to_owned(), 0.1), ("Y".to_owned(), 0.1)]
        );
        assert!((metrics.creator_concentration_index - 0.02).abs() < 1e-9);

        let alerts = crate::evaluate_alerts(&metrics, chrono::Utc::now());
        assert!(alerts
            .iter()
            .all(|a| a.alert_type != recfuse_core::AlertType::CreatorDominance));
    }

    #[test]
    fn age_balance_and_exploration() {
        let entries = vec![entry(
            "a",
            None,
            vec![
                item(&["Drama"], "X", 2025, false, 50.0),
                item(&["Drama"], "X", 2010, false, 50.0),
                item(&["Drama"], "X", 2026, true, 50.0),
                item(&["Drama"], "X", 2000, true, 50.0),
            ],
        )];
        let metrics = compute_metrics(&entries, 2026);
        assert!((metrics.recent_proportion - 0.5).abs() < 1e-9);
        assert!((metrics.content_age_balance - 0.8).abs() < 1e-9);
        assert!((metrics.familiar_proportion - 0.5).abs() < 1e-9);
        assert!((metrics.exploration_score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn demographic_variance_across_buckets() {
        let entries = vec![
            entry("a", Some("18-24"), vec![item(&["Drama"], "X", 2000, false, 90.0)]),
            entry("b", Some("55+"), vec![item(&["Drama"], "X", 2000, false, 10.0)]),
        ];
        let metrics = compute_metrics(&entries, 2026);
        assert_eq!(metrics.bucket_engagement.len(), 2);
        // means 0.9 and 0.1 around 0.5
        assert!((metrics.demographic_variance - 0.16).abs() < 1e-9);
    }

    #[test]
    fn empty_window_is_all_zero() {
        let metrics = compute_metrics(&[], 2026);
        assert_eq!(metrics, FairnessMetrics::default());
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let good = serde_json::to_value(entry("a", None, vec![])).unwrap();
        let rows = vec![
            LogRow {
                method: "get_recommendations".to_owned(),
                user_id: Some("a".to_owned()),
                logged_at: chrono::Utc::now(),
                payload: good,
            },
            LogRow {
                method: "get_recommendations".to_owned(),
                user_id: None,
                logged_at: chrono::Utc::now(),
                payload: serde_json::json!({ "unexpected": true }),
            },
        ];
        let (entries, skipped) = decode_entries(&rows);
        assert_eq!(entries.len(), 1);
        assert_eq!(skipped, 1);
    }
}
