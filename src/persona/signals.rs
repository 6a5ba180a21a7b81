//! Signal extraction: library → [`RawSignals`].
//!
//! Pure function over a slice of items. Every ratio is guarded against a zero
//! denominator and clamped to `[0, 1]`.

use chrono::Timelike;
use thiserror::Error;

use super::types::{ContentItem, PlayStatus, RawSignals, SessionLength, TimeOfDay};

/// Average session length used when nothing was recorded.
pub const DEFAULT_SESSION_MINUTES: f64 = 60.0;
/// Sessions per week used when nothing was recorded.
pub const DEFAULT_SESSIONS_PER_WEEK: u32 = 3;

/// Keywords that mark an item as multiplayer even without feature flags.
pub const MULTIPLAYER_KEYWORDS: &[&str] = &["multiplayer", "co-op", "coop", "online", "pvp", "mmo"];

#[derive(Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("signal {field} is not finite")]
    NonFinite { field: &'static str },
}

/// Derive signals from a library.
///
/// `session_override` is the user-selected session bucket, if any; it wins
/// over the recorded average.
pub fn extract_signals(items: &[ContentItem], session_override: Option<SessionLength>) -> RawSignals {
    let mut signals = RawSignals::fallback();
    signals.item_count = items.len();

    let mut total_minutes = 0.0;
    let mut total_sessions: u32 = 0;
    let mut multiplayer = 0usize;
    let mut completed = 0usize;
    let mut with_last_played = 0usize;
    let mut late_night = 0usize;

    for item in items {
        let hours = sanitize(item.playtime_hours);
        for genre in &item.genres {
            *signals.playtime_by_category.entry(genre.clone()).or_insert(0.0) += hours;
        }
        for mood in &item.moods {
            *signals.mood_distribution.entry(mood.clone()).or_insert(0.0) += hours;
        }

        total_minutes += hours * 60.0;
        total_sessions = total_sessions.saturating_add(item.session_count);

        if is_multiplayer(item) {
            multiplayer += 1;
        }
        if item.status == PlayStatus::Completed {
            completed += 1;
        }
        if let Some(at) = item.last_played {
            with_last_played += 1;
            if TimeOfDay::from_hour(at.hour()) == TimeOfDay::LateNight {
                late_night += 1;
            }
        }
    }

    signals.total_sessions = total_sessions;
    signals.average_session_minutes = match session_override {
        Some(bucket) => bucket.minutes(),
        None if total_sessions > 0 => total_minutes / total_sessions as f64,
        None => DEFAULT_SESSION_MINUTES,
    };
    signals.sessions_per_week = if total_sessions > 0 {
        ((total_sessions as f64 / 4.0).round() as u32).clamp(1, 7)
    } else {
        DEFAULT_SESSIONS_PER_WEEK
    };
    signals.multiplayer_ratio = ratio(multiplayer, items.len());
    signals.completion_rate = ratio(completed, items.len());
    signals.late_night_ratio = ratio(late_night, with_last_played);

    tracing::debug!(
        items = items.len(),
        sessions = total_sessions,
        multiplayer_ratio = signals.multiplayer_ratio,
        completion_rate = signals.completion_rate,
        "signals extracted"
    );
    signals
}

/// Multiplayer feature flags, or a multiplayer keyword in genres/tags.
pub fn is_multiplayer(item: &ContentItem) -> bool {
    item.multiplayer.any()
        || item
            .genres
            .iter()
            .chain(item.tags.iter())
            .any(|k| MULTIPLAYER_KEYWORDS.iter().any(|m| k.to_lowercase().contains(m)))
}

/// Reject signals carrying NaN or infinite values.
pub fn validate(signals: &RawSignals) -> Result<(), SignalError> {
    let scalars = [
        ("average_session_minutes", signals.average_session_minutes),
        ("multiplayer_ratio", signals.multiplayer_ratio),
        ("late_night_ratio", signals.late_night_ratio),
        ("completion_rate", signals.completion_rate),
    ];
    for (field, value) in scalars {
        if !value.is_finite() {
            return Err(SignalError::NonFinite { field });
        }
    }
    if signals.playtime_by_category.values().any(|v| !v.is_finite()) {
        return Err(SignalError::NonFinite { field: "playtime_by_category" });
    }
    if signals.mood_distribution.values().any(|v| !v.is_finite()) {
        return Err(SignalError::NonFinite { field: "mood_distribution" });
    }
    Ok(())
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        (numerator as f64 / denominator as f64).clamp(0.0, 1.0)
    }
}

fn sanitize(hours: f64) -> f64 {
    if hours.is_finite() {
        hours.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(id: &str, genres: &[&str], hours: f64, sessions: u32) -> ContentItem {
        let mut item = ContentItem::new(id, id);
        item.genres = genres.iter().map(|g| g.to_string()).collect();
        item.playtime_hours = hours;
        item.session_count = sessions;
        item
    }

    #[test]
    fn test_empty_library_yields_defaults() {
        let signals = extract_signals(&[], None);
        assert_eq!(signals, RawSignals::fallback());
        assert_eq!(signals.average_session_minutes, 60.0);
        assert_eq!(signals.sessions_per_week, 3);
        assert_eq!(signals.multiplayer_ratio, 0.0);
    }

    #[test]
    fn test_playtime_counts_toward_every_category() {
        let items = vec![item("a", &["rpg", "action"], 10.0, 0), item("b", &["rpg"], 5.0, 0)];
        let signals = extract_signals(&items, None);
        assert_eq!(signals.playtime_by_category["rpg"], 15.0);
        assert_eq!(signals.playtime_by_category["action"], 10.0);
    }

    #[test]
    fn test_average_session_from_sessions() {
        // 3h over 4 sessions = 45 minutes
        let items = vec![item("a", &[], 3.0, 4)];
        let signals = extract_signals(&items, None);
        assert_eq!(signals.average_session_minutes, 45.0);
        assert_eq!(signals.sessions_per_week, 1);
    }

    #[test]
    fn test_session_override_wins() {
        let items = vec![item("a", &[], 3.0, 4)];
        let signals = extract_signals(&items, Some(SessionLength::Long));
        assert_eq!(signals.average_session_minutes, 120.0);
    }

    #[test]
    fn test_sessions_per_week_is_clamped() {
        let items = vec![item("a", &[], 100.0, 200)];
        assert_eq!(extract_signals(&items, None).sessions_per_week, 7);
        let items = vec![item("a", &[], 1.0, 1)];
        assert_eq!(extract_signals(&items, None).sessions_per_week, 1);
    }

    #[test]
    fn test_ratios() {
        let mut a = item("a", &["shooter"], 1.0, 1);
        a.multiplayer.online = true;
        a.status = PlayStatus::Completed;
        a.last_played = Some(Utc.with_ymd_and_hms(2026, 1, 1, 23, 0, 0).unwrap());
        let mut b = item("b", &["co-op shooter"], 1.0, 1);
        b.last_played = Some(Utc.with_ymd_and_hms(2026, 1, 1, 14, 0, 0).unwrap());
        let c = item("c", &["puzzle"], 1.0, 1);
        let d = item("d", &["puzzle"], 1.0, 1);

        let signals = extract_signals(&[a, b, c, d], None);
        assert_eq!(signals.multiplayer_ratio, 0.5);
        assert_eq!(signals.completion_rate, 0.25);
        assert_eq!(signals.late_night_ratio, 0.5);
    }

    #[test]
    fn test_mood_distribution_sums_playtime() {
        let mut a = item("a", &[], 4.0, 0);
        a.moods = vec!["chill".into(), "creative".into()];
        let mut b = item("b", &[], 2.0, 0);
        b.moods = vec!["chill".into()];
        let signals = extract_signals(&[a, b], None);
        assert_eq!(signals.mood_distribution["chill"], 6.0);
        assert_eq!(signals.mood_distribution["creative"], 4.0);
    }

    #[test]
    fn test_non_finite_playtime_is_ignored() {
        let items = vec![item("a", &["rpg"], f64::NAN, 2), item("b", &["rpg"], f64::INFINITY, 0)];
        let signals = extract_signals(&items, None);
        assert_eq!(signals.playtime_by_category["rpg"], 0.0);
        assert!(validate(&signals).is_ok());
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut signals = RawSignals::fallback();
        signals.completion_rate = f64::NAN;
        assert_eq!(
            validate(&signals),
            Err(SignalError::NonFinite { field: "completion_rate" })
        );
    }
}
