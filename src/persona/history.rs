//! Snapshot history: a capacity-bounded, newest-first log of [`IdentitySnapshot`]s.
//!
//! The whole list lives under [`HISTORY_KEY`] and is replaced wholesale on
//! every write. Writes go through one mutex so the read, prepend and truncate
//! sequence is atomic with respect to other writers of the same history.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::builder::PersonaProfile;
use super::matcher::mood_affinity;
use super::types::{
    ContentItem, IdentityItem, IdentitySnapshot, PlayPattern, PlayStatus, RawSignals,
    SessionLength, TimeOfDay,
};
use crate::config::HistoryConfig;
use crate::store::{DocumentStore, HISTORY_KEY};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("import payload must be a JSON array of snapshots")]
    NotAnArray,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryStats {
    pub count: usize,
    pub capacity: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    /// Mood → number of snapshots listing it as dominant.
    pub mood_frequency: BTreeMap<String, usize>,
    pub most_common_mood: Option<String>,
    pub average_completion_rate: f64,
    pub average_multiplayer_ratio: f64,
    pub average_session_minutes: f64,
}

pub struct SnapshotHistory {
    store: Arc<dyn DocumentStore>,
    capacity: usize,
    interval: Duration,
    write_lock: Mutex<()>,
}

impl SnapshotHistory {
    pub fn new(store: Arc<dyn DocumentStore>, config: &HistoryConfig) -> Self {
        Self {
            store,
            capacity: config.capacity.max(1),
            interval: Duration::try_days(config.snapshot_interval_days.max(0))
                .unwrap_or(Duration::MAX),
            write_lock: Mutex::new(()),
        }
    }

    /// Stored snapshots, newest first. Unreadable entries are skipped.
    pub fn list(&self) -> Result<Vec<IdentitySnapshot>> {
        let entries = match self.store.get(HISTORY_KEY)? {
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                tracing::warn!("identity history is not an array, treating as empty");
                return Ok(Vec::new());
            }
            None => return Ok(Vec::new()),
        };
        let total = entries.len();
        let snapshots: Vec<IdentitySnapshot> = entries
            .into_iter()
            .filter_map(|e| serde_json::from_value(e).ok())
            .collect();
        if snapshots.len() < total {
            tracing::warn!(skipped = total - snapshots.len(), "skipped unreadable snapshots");
        }
        Ok(snapshots)
    }

    pub fn get(&self, id: &str) -> Result<Option<IdentitySnapshot>> {
        Ok(self.list()?.into_iter().find(|s| s.id == id))
    }

    pub fn latest(&self) -> Result<Option<IdentitySnapshot>> {
        Ok(self.list()?.into_iter().next())
    }

    /// Prepend `snapshot`, evicting the oldest records beyond capacity.
    /// Returns the new history length.
    pub fn save(&self, snapshot: IdentitySnapshot) -> Result<usize> {
        let _guard = self.lock()?;
        let mut snapshots = self.list()?;
        let id = snapshot.id.clone();
        snapshots.retain(|s| s.id != id);
        snapshots.insert(0, snapshot);

        let evicted = snapshots.len().saturating_sub(self.capacity);
        snapshots.truncate(self.capacity);
        self.write(&snapshots)?;

        tracing::info!(id = %id, count = snapshots.len(), evicted, "snapshot saved");
        Ok(snapshots.len())
    }

    /// Remove one snapshot. Returns false if the id was not present.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.lock()?;
        let mut snapshots = self.list()?;
        let before = snapshots.len();
        snapshots.retain(|s| s.id != id);
        if snapshots.len() == before {
            return Ok(false);
        }
        self.write(&snapshots)?;
        tracing::info!(id, count = snapshots.len(), "snapshot deleted");
        Ok(true)
    }

    pub fn clear(&self) -> Result<()> {
        let _guard = self.lock()?;
        self.store.remove(HISTORY_KEY)?;
        tracing::info!("identity history cleared");
        Ok(())
    }

    /// True with no prior snapshot, or once the interval has elapsed since it.
    pub fn should_snapshot_now(&self, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last {
            None => true,
            Some(last) => now - last >= self.interval,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> Result<bool> {
        let last = self.latest()?.map(|s| s.timestamp);
        Ok(self.should_snapshot_now(last, now))
    }

    /// The whole history as a pretty-printed JSON array.
    pub fn export_all(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.list()?)?)
    }

    /// Replace the history with the valid records of `payload`.
    ///
    /// Records missing a required field are dropped, not fatal. Accepted
    /// records are de-duplicated by id, sorted newest first and truncated to
    /// capacity (overflow counts as dropped).
    pub fn import_all(&self, payload: &str) -> Result<ImportReport, ImportError> {
        let parsed: Value = serde_json::from_str(payload)?;
        let Value::Array(entries) = parsed else {
            return Err(ImportError::NotAnArray);
        };
        let total = entries.len();

        let mut seen = HashSet::new();
        let mut accepted: Vec<IdentitySnapshot> = entries
            .into_iter()
            .filter(is_valid_record)
            .filter_map(|e| serde_json::from_value::<IdentitySnapshot>(e).ok())
            .filter(|s| seen.insert(s.id.clone()))
            .collect();

        accepted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        accepted.truncate(self.capacity);

        let _guard = self.lock()?;
        self.write(&accepted)?;

        let report = ImportReport {
            imported: accepted.len(),
            dropped: total - accepted.len(),
        };
        tracing::info!(imported = report.imported, dropped = report.dropped, "history imported");
        Ok(report)
    }

    pub fn stats(&self) -> Result<HistoryStats> {
        let snapshots = self.list()?;
        Ok(compute_stats(&snapshots, self.capacity))
    }

    fn write(&self, snapshots: &[IdentitySnapshot]) -> Result<()> {
        self.store.set(HISTORY_KEY, &serde_json::to_value(snapshots)?)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| anyhow!("history lock poisoned: {e}"))
    }
}

/// Minimal shape check applied to imported records.
fn is_valid_record(record: &Value) -> bool {
    let non_empty_str = |key: &str| record.get(key).and_then(Value::as_str).is_some_and(|s| !s.trim().is_empty());
    let string_array = |key: &str| {
        record
            .get(key)
            .and_then(Value::as_array)
            .is_some_and(|a| a.iter().all(Value::is_string))
    };

    non_empty_str("id")
        && record
            .get("timestamp")
            .and_then(Value::as_str)
            .is_some_and(|t| DateTime::parse_from_rfc3339(t).is_ok())
        && string_array("dominant_moods")
        && record
            .get("preferred_session_length")
            .and_then(Value::as_str)
            .is_some_and(|s| s.parse::<SessionLength>().is_ok())
        && string_array("preferred_times")
        && record.get("narrative").is_some_and(Value::is_string)
}

fn compute_stats(snapshots: &[IdentitySnapshot], capacity: usize) -> HistoryStats {
    let mut mood_frequency: BTreeMap<String, usize> = BTreeMap::new();
    for snapshot in snapshots {
        for mood in &snapshot.dominant_moods {
            *mood_frequency.entry(mood.clone()).or_insert(0) += 1;
        }
    }
    // ties go to the alphabetically first mood
    let most_common_mood = mood_frequency
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(mood, _)| mood.clone());

    let average = |field: fn(&IdentitySnapshot) -> f64| {
        if snapshots.is_empty() {
            0.0
        } else {
            snapshots.iter().map(field).sum::<f64>() / snapshots.len() as f64
        }
    };

    HistoryStats {
        count: snapshots.len(),
        capacity,
        oldest: snapshots.iter().map(|s| s.timestamp).min(),
        newest: snapshots.iter().map(|s| s.timestamp).max(),
        mood_frequency,
        most_common_mood,
        average_completion_rate: average(|s| s.completion_rate),
        average_multiplayer_ratio: average(|s| s.multiplayer_ratio),
        average_session_minutes: average(|s| s.average_session_minutes),
    }
}

/// Build a history record from the current library and its profile.
pub fn synthesize_snapshot(
    items: &[ContentItem],
    profile: &PersonaProfile,
    now: DateTime<Utc>,
    top_n: usize,
) -> IdentitySnapshot {
    let signals = &profile.signals;
    let persona = &profile.persona;
    let preferred_session_length = persona.pacing.session_length();
    let preferred_times = preferred_times(items);
    let recent_patterns = recent_patterns(items, signals);
    let top_items = top_items(items, top_n);

    let narrative = short_narrative(&persona.dominant_moods, preferred_session_length, &preferred_times);
    let full_narrative = full_narrative(profile, &narrative, &recent_patterns, &top_items);

    IdentitySnapshot {
        id: uuid::Uuid::now_v7().to_string(),
        timestamp: now,
        dominant_moods: persona.dominant_moods.clone(),
        preferred_session_length,
        preferred_times,
        recent_patterns,
        completion_rate: signals.completion_rate,
        multiplayer_ratio: signals.multiplayer_ratio,
        average_session_minutes: signals.average_session_minutes,
        top_items,
        mood_affinity: mood_affinity(&signals.mood_distribution),
        archetype: Some(persona.archetype),
        narrative,
        full_narrative,
    }
}

/// The two most frequent time-of-day buckets among items' last-played hours.
/// Defaults to the evening when nothing has been played.
pub fn preferred_times(items: &[ContentItem]) -> Vec<TimeOfDay> {
    let mut counts: BTreeMap<TimeOfDay, usize> = BTreeMap::new();
    for at in items.iter().filter_map(|i| i.last_played) {
        *counts.entry(TimeOfDay::from_hour(at.hour())).or_insert(0) += 1;
    }
    if counts.is_empty() {
        return vec![TimeOfDay::Evening];
    }

    let mut ranked: Vec<(TimeOfDay, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(2).map(|(time, _)| time).collect()
}

/// Play patterns visible in the library right now.
pub fn recent_patterns(items: &[ContentItem], signals: &RawSignals) -> Vec<PlayPattern> {
    let mut patterns = Vec::new();
    if items.is_empty() {
        return patterns;
    }

    let unstarted = items
        .iter()
        .filter(|i| matches!(i.status, PlayStatus::Unplayed | PlayStatus::Backlog))
        .count();
    let playing = items.iter().filter(|i| i.status == PlayStatus::Playing).count();

    if signals.completion_rate >= 0.5 {
        patterns.push(PlayPattern::Completionist);
    }
    if unstarted as f64 / items.len() as f64 >= 0.3 {
        patterns.push(PlayPattern::Explorer);
    }
    if signals.average_session_minutes > 90.0 {
        patterns.push(PlayPattern::Marathoner);
    }
    if signals.multiplayer_ratio > 0.5 {
        patterns.push(PlayPattern::Social);
    }
    if signals.late_night_ratio >= 0.3 {
        patterns.push(PlayPattern::NightOwl);
    }
    if playing > 0 && signals.sessions_per_week >= 5 {
        patterns.push(PlayPattern::Dedicated);
    }
    patterns
}

/// Identity score: playtime, a tenth of completion, +5 if completed, +3 if playing.
pub fn identity_score(item: &ContentItem) -> f64 {
    let status_bonus = match item.status {
        PlayStatus::Completed => 5.0,
        PlayStatus::Playing => 3.0,
        _ => 0.0,
    };
    item.playtime_hours + item.completion_percent / 10.0 + status_bonus
}

fn top_items(items: &[ContentItem], top_n: usize) -> Vec<IdentityItem> {
    let mut scored: Vec<IdentityItem> = items
        .iter()
        .map(|item| IdentityItem {
            id: item.id.clone(),
            title: item.title.clone(),
            score: identity_score(item),
        })
        .filter(|i| i.score > 0.0)
        .collect();
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.title.cmp(&b.title))
    });
    scored.truncate(top_n);
    scored
}

fn short_narrative(moods: &[String], session: SessionLength, times: &[TimeOfDay]) -> String {
    let mood_text = match moods {
        [] => "still finding your groove".to_string(),
        [only] => format!("mostly {only}"),
        [first, rest @ ..] => format!("mostly {first}, with some {}", rest.join(" and ")),
    };
    let time_text = times
        .first()
        .map(|t| t.as_str().replace('_', " "))
        .unwrap_or_else(|| "evening".into());
    format!("{mood_text}; {session} sessions, usually in the {time_text}")
}

fn full_narrative(
    profile: &PersonaProfile,
    short: &str,
    patterns: &[PlayPattern],
    top: &[IdentityItem],
) -> String {
    let signals = &profile.signals;
    let mut parts = vec![format!("{}: {short}.", profile.persona.archetype.label())];

    parts.push(format!(
        "You finish {:.0}% of your library and {:.0}% of it is multiplayer.",
        signals.completion_rate * 100.0,
        signals.multiplayer_ratio * 100.0
    ));
    parts.push(format!(
        "Sessions average {:.0} minutes.",
        signals.average_session_minutes
    ));
    if !patterns.is_empty() {
        let names: Vec<String> = patterns.iter().map(|p| p.as_str().replace('_', " ")).collect();
        parts.push(format!("Lately you play like a {}.", names.join(", ")));
    }
    if let Some(first) = top.first() {
        parts.push(format!("{} defines this chapter.", first.title));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::builder::build_profile;
    use crate::store::memory::MemoryDocumentStore;
    use chrono::TimeZone;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 20, 0, 0).unwrap()
    }

    fn history(capacity: usize) -> SnapshotHistory {
        let config = HistoryConfig {
            capacity,
            ..HistoryConfig::default()
        };
        SnapshotHistory::new(Arc::new(MemoryDocumentStore::default()), &config)
    }

    #[test]
    fn test_out_of_range_interval_never_comes_due() {
        let config = HistoryConfig {
            snapshot_interval_days: i64::MAX,
            ..HistoryConfig::default()
        };
        let history = SnapshotHistory::new(Arc::new(MemoryDocumentStore::default()), &config);
        assert!(history.should_snapshot_now(None, base_time()));
        assert!(!history.should_snapshot_now(Some(base_time()), base_time() + Duration::days(365_000)));
    }

    fn snapshot(id: &str, days: i64) -> IdentitySnapshot {
        IdentitySnapshot {
            id: id.into(),
            timestamp: base_time() + Duration::days(days),
            dominant_moods: vec!["chill".into()],
            preferred_session_length: SessionLength::Short,
            preferred_times: vec![TimeOfDay::Evening],
            recent_patterns: vec![],
            completion_rate: 0.5,
            multiplayer_ratio: 0.0,
            average_session_minutes: 30.0,
            top_items: vec![],
            mood_affinity: BTreeMap::new(),
            archetype: None,
            narrative: "n".into(),
            full_narrative: String::new(),
        }
    }

    #[test]
    fn test_save_prepends_and_evicts_oldest() {
        let history = history(20);
        for n in 0..21 {
            history.save(snapshot(&format!("s{n}"), n)).unwrap();
        }
        let list = history.list().unwrap();
        assert_eq!(list.len(), 20);
        assert_eq!(list[0].id, "s20");
        assert_eq!(list[19].id, "s1");
        assert!(history.get("s0").unwrap().is_none());
    }

    #[test]
    fn test_should_snapshot_now_policy() {
        let history = history(20);
        let now = base_time();
        assert!(history.should_snapshot_now(None, now));
        assert!(!history.should_snapshot_now(Some(now - Duration::days(6)), now));
        assert!(history.should_snapshot_now(Some(now - Duration::days(7)), now));
    }

    #[test]
    fn test_delete_and_clear() {
        let history = history(5);
        history.save(snapshot("a", 0)).unwrap();
        history.save(snapshot("b", 1)).unwrap();
        assert!(history.delete("a").unwrap());
        assert!(!history.delete("a").unwrap());
        assert_eq!(history.list().unwrap().len(), 1);
        history.clear().unwrap();
        assert!(history.list().unwrap().is_empty());
    }

    #[test]
    fn test_import_drops_invalid_and_sorts() {
        let history = history(20);
        let good_old = serde_json::to_value(snapshot("old", 0)).unwrap();
        let good_new = serde_json::to_value(snapshot("new", 5)).unwrap();
        let mut missing_narrative = serde_json::to_value(snapshot("bad", 3)).unwrap();
        missing_narrative.as_object_mut().unwrap().remove("narrative");
        let mut bad_session = serde_json::to_value(snapshot("bad2", 3)).unwrap();
        bad_session["preferred_session_length"] = Value::from("forever");

        let payload = serde_json::to_string(&vec![good_old, missing_narrative, good_new, bad_session, Value::from(7)]).unwrap();
        let report = history.import_all(&payload).unwrap();
        assert_eq!(report, ImportReport { imported: 2, dropped: 3 });

        let ids: Vec<String> = history.list().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn test_import_rejects_non_array() {
        let history = history(20);
        assert!(matches!(history.import_all("{\"a\": 1}"), Err(ImportError::NotAnArray)));
        assert!(matches!(history.import_all("not json"), Err(ImportError::InvalidJson(_))));
    }

    #[test]
    fn test_export_import_round_trip() {
        let source = history(20);
        for n in 0..4 {
            source.save(snapshot(&format!("s{n}"), n)).unwrap();
        }
        let exported = source.export_all().unwrap();

        let target = history(20);
        let report = target.import_all(&exported).unwrap();
        assert_eq!(report.dropped, 0);
        assert_eq!(target.list().unwrap(), source.list().unwrap());
    }

    #[test]
    fn test_stats() {
        let history = history(20);
        let mut a = snapshot("a", 0);
        a.dominant_moods = vec!["story".into(), "chill".into()];
        a.completion_rate = 0.25;
        history.save(a).unwrap();
        history.save(snapshot("b", 2)).unwrap();

        let stats = history.stats().unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mood_frequency["chill"], 2);
        assert_eq!(stats.most_common_mood.as_deref(), Some("chill"));
        assert_eq!(stats.oldest, Some(base_time()));
        assert_eq!(stats.newest, Some(base_time() + Duration::days(2)));
        assert!((stats.average_completion_rate - 0.375).abs() < 1e-9);
    }

    #[test]
    fn test_synthesized_snapshot() {
        let mut a = ContentItem::new("a", "Hollow Knight");
        a.moods = vec!["adventure".into()];
        a.playtime_hours = 40.0;
        a.completion_percent = 80.0;
        a.status = PlayStatus::Completed;
        a.session_count = 20;
        a.last_played = Some(Utc.with_ymd_and_hms(2026, 1, 1, 23, 0, 0).unwrap());
        let mut b = ContentItem::new("b", "Tetris");
        b.moods = vec!["chill".into()];
        b.playtime_hours = 2.0;
        b.session_count = 4;
        b.last_played = Some(Utc.with_ymd_and_hms(2026, 1, 2, 9, 0, 0).unwrap());
        let c = ContentItem::new("c", "Unopened");

        let items = vec![a, b, c];
        let profile = build_profile(&items, None, None);
        let snapshot = synthesize_snapshot(&items, &profile, base_time(), 5);

        assert_eq!(uuid::Uuid::parse_str(&snapshot.id).unwrap().get_version_num(), 7);
        assert_eq!(snapshot.dominant_moods, vec!["adventure", "chill"]);
        assert_eq!(snapshot.preferred_times, vec![TimeOfDay::Morning, TimeOfDay::LateNight]);
        assert_eq!(snapshot.top_items.len(), 2);
        assert_eq!(snapshot.top_items[0].id, "a");
        assert_eq!(snapshot.top_items[0].score, 53.0);
        assert!(snapshot.narrative.contains("mostly adventure"));
        assert!(snapshot.full_narrative.contains("Hollow Knight"));
        assert!(snapshot.recent_patterns.contains(&PlayPattern::Explorer));
        assert!(snapshot.recent_patterns.contains(&PlayPattern::NightOwl));
    }

    #[test]
    fn test_preferred_times_default_to_evening() {
        assert_eq!(preferred_times(&[ContentItem::new("x", "X")]), vec![TimeOfDay::Evening]);
    }
}
