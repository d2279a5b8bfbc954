//! Per-user temporal behavior profiles and their computation from raw
//! watch sessions.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum number of genres kept in [`UserTemporalProfile::top_genres`].
pub const TOP_GENRE_LIMIT: usize = 5;

/// A session must start within this gap after the previous one ends to
/// extend a binge chain.
const BINGE_GAP_MINUTES: i64 = 30;
const BINGE_MIN_SESSIONS: usize = 3;

/// Share of sessions an hour-of-day needs to count as preferred.
const PREFERRED_HOUR_SHARE: f64 = 0.10;

/// Upper bound on a single session's length. Longer (or non-finite)
/// durations in the behavior log are treated as this long.
pub const MAX_SESSION_MINUTES: f64 = 24.0 * 60.0;

/// One row of the behavior log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchSession {
    pub user_id: String,
    pub title_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_minutes: f64,
    pub genres: Vec<String>,
    pub device: String,
}

impl WatchSession {
    /// Duration clamped to `0..=MAX_SESSION_MINUTES`; NaN counts as zero.
    #[must_use]
    pub fn clamped_minutes(&self) -> f64 {
        if self.duration_minutes.is_nan() {
            return 0.0;
        }
        self.duration_minutes.clamp(0.0, MAX_SESSION_MINUTES)
    }

    fn ended_at(&self) -> DateTime<Utc> {
        #[allow(clippy::cast_possible_truncation)]
        let seconds = (self.clamped_minutes() * 60.0).round() as i64;
        Duration::try_seconds(seconds)
            .and_then(|elapsed| self.started_at.checked_add_signed(elapsed))
            .unwrap_or(self.started_at)
    }
}

/// Precomputed viewing-behavior summary; one row per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTemporalProfile {
    pub user_id: String,
    pub avg_session_minutes: f64,
    pub total_watch_hours: f64,
    pub binge_session_count: u32,
    /// Most-watched genres, most frequent first, at most [`TOP_GENRE_LIMIT`].
    pub top_genres: Vec<String>,
    /// Hours of day (0-23), ascending.
    pub preferred_hours: Vec<u8>,
    /// Device name to share of sessions; shares sum to 1 when non-empty.
    pub device_split: BTreeMap<String, f64>,
    /// Forward-compatible signals that have no dedicated column yet.
    pub extensions: Map<String, Value>,
    pub last_computed_at: DateTime<Utc>,
}

impl UserTemporalProfile {
    /// `true` when the profile was computed less than `freshness` before `now`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, freshness: Duration) -> bool {
        now.signed_duration_since(self.last_computed_at) < freshness
    }
}

/// Compute a profile from a user's sessions. Sessions may arrive unordered.
#[must_use]
pub fn compute_profile(
    user_id: &str,
    sessions: &[WatchSession],
    now: DateTime<Utc>,
) -> UserTemporalProfile {
    let mut ordered: Vec<&WatchSession> = sessions.iter().collect();
    ordered.sort_by_key(|s| s.started_at);

    #[allow(clippy::cast_precision_loss)]
    let count = ordered.len() as f64;
    let total_minutes: f64 = ordered.iter().map(|s| s.clamped_minutes()).sum();
    let avg_session_minutes = if ordered.is_empty() {
        0.0
    } else {
        total_minutes / count
    };

    let mut extensions = Map::new();
    let weekend = ordered
        .iter()
        .filter(|s| matches!(s.started_at.weekday(), Weekday::Sat | Weekday::Sun))
        .count();
    #[allow(clippy::cast_precision_loss)]
    let weekend_ratio = if ordered.is_empty() {
        0.0
    } else {
        weekend as f64 / count
    };
    extensions.insert("weekend_ratio".to_string(), Value::from(weekend_ratio));
    let distinct_titles: HashSet<&str> = ordered.iter().map(|s| s.title_id.as_str()).collect();
    extensions.insert(
        "distinct_titles".to_string(),
        Value::from(distinct_titles.len()),
    );

    UserTemporalProfile {
        user_id: user_id.to_string(),
        avg_session_minutes,
        total_watch_hours: total_minutes / 60.0,
        binge_session_count: count_binges(&ordered),
        top_genres: top_genres(&ordered),
        preferred_hours: preferred_hours(&ordered),
        device_split: device_split(&ordered),
        extensions,
        last_computed_at: now,
    }
}

fn count_binges(ordered: &[&WatchSession]) -> u32 {
    let mut binges = 0u32;
    let mut chain = 0usize;
    let mut previous_end: Option<DateTime<Utc>> = None;

    for session in ordered {
        let continues = previous_end.is_some_and(|end| {
            session.started_at <= end + Duration::minutes(BINGE_GAP_MINUTES)
        });
        if continues {
            chain += 1;
        } else {
            if chain >= BINGE_MIN_SESSIONS {
                binges += 1;
            }
            chain = 1;
        }
        previous_end = Some(session.ended_at());
    }
    if chain >= BINGE_MIN_SESSIONS {
        binges += 1;
    }
    binges
}

fn top_genres(ordered: &[&WatchSession]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for session in ordered {
        for genre in &session.genres {
            *counts.entry(genre.as_str()).or_default() += 1;
        }
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(TOP_GENRE_LIMIT)
        .map(|(genre, _)| genre.to_string())
        .collect()
}

fn preferred_hours(ordered: &[&WatchSession]) -> Vec<u8> {
    if ordered.is_empty() {
        return Vec::new();
    }
    let mut counts = [0usize; 24];
    for session in ordered {
        counts[session.started_at.hour() as usize] += 1;
    }
    #[allow(clippy::cast_precision_loss)]
    let total = ordered.len() as f64;

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let mut hours: Vec<u8> = counts
        .iter()
        .enumerate()
        .filter(|(_, &n)| n > 0 && n as f64 / total >= PREFERRED_HOUR_SHARE)
        .map(|(hour, _)| hour as u8)
        .collect();

    if hours.is_empty() {
        // Sessions spread thinly over many hours: keep the single busiest one.
        let busiest = counts
            .iter()
            .enumerate()
            .max_by_key(|(h, &n)| (n, 24 - h))
            .map(|(hour, _)| hour);
        if let Some(hour) = busiest.and_then(|h| u8::try_from(h).ok()) {
            hours.push(hour);
        }
    }
    hours
}

fn device_split(ordered: &[&WatchSession]) -> BTreeMap<String, f64> {
    let mut split: BTreeMap<String, f64> = BTreeMap::new();
    for session in ordered {
        *split.entry(session.device.clone()).or_insert(0.0) += 1.0;
    }
    let total: f64 = split.values().sum();
    for share in split.values_mut() {
        *share /= total;
    }
    split
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn session(start: DateTime<Utc>, minutes: f64, genres: &[&str], device: &str) -> WatchSession {
        WatchSession {
            user_id: "u1".to_string(),
            title_id: format!("t-{}", start.timestamp()),
            started_at: start,
            duration_minutes: minutes,
            genres: genres.iter().map(|g| (*g).to_string()).collect(),
            device: device.to_string(),
        }
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn empty_sessions_produce_zeroed_profile() {
        let now = at(10, 0, 0);
        let profile = compute_profile("u1", &[], now);
        assert_eq!(profile.avg_session_minutes, 0.0);
        assert_eq!(profile.binge_session_count, 0);
        assert!(profile.top_genres.is_empty());
        assert!(profile.preferred_hours.is_empty());
        assert!(profile.device_split.is_empty());
        assert_eq!(profile.last_computed_at, now);
    }

    #[test]
    fn three_back_to_back_episodes_count_as_one_binge() {
        let sessions = vec![
            session(at(2, 20, 0), 45.0, &["drama"], "tv"),
            session(at(2, 20, 50), 45.0, &["drama"], "tv"),
            session(at(2, 21, 40), 45.0, &["drama"], "tv"),
            session(at(4, 20, 0), 45.0, &["comedy"], "phone"),
        ];
        let profile = compute_profile("u1", &sessions, at(10, 0, 0));
        assert_eq!(profile.binge_session_count, 1);
        assert!((profile.avg_session_minutes - 45.0).abs() < 1e-9);
        assert!((profile.total_watch_hours - 3.0).abs() < 1e-9);
    }

    #[test]
    fn top_genres_are_bounded_and_ranked_by_frequency() {
        let sessions = vec![
            session(at(1, 10, 0), 30.0, &["a", "b", "c"], "tv"),
            session(at(2, 10, 0), 30.0, &["a", "d", "e"], "tv"),
            session(at(3, 10, 0), 30.0, &["a", "b", "f"], "tv"),
        ];
        let profile = compute_profile("u1", &sessions, at(10, 0, 0));
        assert_eq!(profile.top_genres.len(), TOP_GENRE_LIMIT);
        assert_eq!(profile.top_genres[0], "a");
        assert_eq!(profile.top_genres[1], "b");
    }

    #[test]
    fn device_split_sums_to_one() {
        let sessions = vec![
            session(at(1, 9, 0), 20.0, &[], "tv"),
            session(at(1, 12, 0), 20.0, &[], "phone"),
            session(at(1, 18, 0), 20.0, &[], "phone"),
            session(at(1, 22, 0), 20.0, &[], "tablet"),
        ];
        let profile = compute_profile("u1", &sessions, at(10, 0, 0));
        let sum: f64 = profile.device_split.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!((profile.device_split["phone"] - 0.5).abs() < 1e-9);
        assert_eq!(profile.preferred_hours, vec![9, 12, 18, 22]);
    }

    #[test]
    fn corrupt_durations_are_clamped() {
        let sessions = vec![
            session(at(2, 20, 0), f64::INFINITY, &["drama"], "tv"),
            session(at(2, 21, 0), f64::INFINITY, &["drama"], "tv"),
            session(at(3, 20, 0), f64::NAN, &["drama"], "tv"),
            session(at(4, 20, 0), -30.0, &["drama"], "tv"),
        ];
        let profile = compute_profile("u1", &sessions, at(10, 0, 0));
        assert!((profile.total_watch_hours - 48.0).abs() < 1e-9);
        assert!((profile.avg_session_minutes - 720.0).abs() < 1e-9);
        assert!(profile.avg_session_minutes.is_finite());
    }

    #[test]
    fn session_end_saturates_at_the_maximum_length() {
        let s = session(at(2, 20, 0), 1e300, &[], "tv");
        assert_eq!(s.ended_at(), at(3, 20, 0));
    }

    #[test]
    fn freshness_window_is_exclusive() {
        let now = at(10, 12, 0);
        let mut profile = compute_profile("u1", &[], now - Duration::hours(23));
        assert!(profile.is_fresh(now, Duration::hours(24)));
        profile.last_computed_at = now - Duration::hours(24);
        assert!(!profile.is_fresh(now, Duration::hours(24)));
    }
}
