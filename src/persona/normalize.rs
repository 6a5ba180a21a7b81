//! Lenient normalization of library records into [`ContentItem`]s.
//!
//! Library collaborators hand over loosely-shaped JSON: genres may be plain
//! strings or `{ "name": ... }` objects, numbers may arrive as strings, and
//! most fields are optional. Everything is resolved here so the scoring code
//! only ever sees one representation. Nothing in this module fails: wrong
//! types and absent fields fall back to zero or empty.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use super::types::{ContentItem, MultiplayerFeatures, PlayStatus, SessionLength, TimeOfDay};

/// Normalize a whole library payload.
///
/// Accepts a bare array or an object wrapping one under `games` or `items`.
/// Entries that are not JSON objects are skipped.
pub fn normalize_library(payload: &Value) -> Vec<ContentItem> {
    let entries: &[Value] = match payload {
        Value::Array(entries) => entries.as_slice(),
        Value::Object(map) => match map.get("games").or_else(|| map.get("items")) {
            Some(Value::Array(entries)) => entries.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    let mut skipped = 0usize;
    let items: Vec<ContentItem> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            if entry.is_object() {
                Some(normalize_item_at(entry, index))
            } else {
                skipped += 1;
                None
            }
        })
        .collect();

    if skipped > 0 {
        tracing::warn!(skipped, kept = items.len(), "skipped non-object library entries");
    }
    items
}

/// Normalize a single record. Missing ids are left empty.
pub fn normalize_item(record: &Value) -> ContentItem {
    build_item(record, None)
}

fn normalize_item_at(record: &Value, index: usize) -> ContentItem {
    build_item(record, Some(index))
}

fn build_item(record: &Value, index: Option<usize>) -> ContentItem {
    let id = first_string(record, &["id", "gameId", "game_id"])
        .or_else(|| index.map(|i| format!("item-{i}")))
        .unwrap_or_default();
    let title = first_string(record, &["title", "name"]).unwrap_or_else(|| id.clone());

    let status = first_string(record, &["status", "playStatus", "play_status"])
        .and_then(|s| s.parse::<PlayStatus>().ok())
        .unwrap_or_default();

    ContentItem {
        id,
        title,
        genres: label_list(record, &["genres", "categories", "genre"]),
        tags: label_list(record, &["tags"]),
        moods: label_list(record, &["moods", "mood"]),
        playtime_hours: non_negative(first_number(
            record,
            &["playtimeHours", "playtime_hours", "playtime", "hoursPlayed"],
        )),
        completion_percent: first_number(
            record,
            &["completionPercent", "completion_percent", "completion", "progress"],
        )
        .clamp(0.0, 100.0),
        status,
        session_count: non_negative(first_number(
            record,
            &["sessionCount", "session_count", "sessions"],
        ))
        .round() as u32,
        last_played: first_timestamp(
            record,
            &["lastPlayed", "last_played", "lastInteracted", "updatedAt"],
        ),
        multiplayer: multiplayer_features(record),
        session_length: first_string(record, &["sessionLength", "session_length"])
            .and_then(|s| s.parse::<SessionLength>().ok()),
        recommended_times: label_list(record, &["recommendedTimes", "recommended_times"])
            .iter()
            .filter_map(|s| s.parse::<TimeOfDay>().ok())
            .collect(),
    }
}

/// Resolve a label that is either a string or an object carrying `name`/`id`.
fn label(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("id"))
            .and_then(Value::as_str),
        _ => None,
    }?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

fn label_list(record: &Value, keys: &[&str]) -> Vec<String> {
    let Some(value) = keys.iter().find_map(|k| record.get(*k)) else {
        return Vec::new();
    };
    let mut labels: Vec<String> = match value {
        Value::Array(entries) => entries.iter().filter_map(label).collect(),
        other => label(other).into_iter().collect(),
    };
    // keep first occurrence order
    let mut seen = std::collections::HashSet::new();
    labels.retain(|l| seen.insert(l.clone()));
    labels
}

fn first_string(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match record.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn first_number(record: &Value, keys: &[&str]) -> f64 {
    keys.iter()
        .find_map(|k| match record.get(*k)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn non_negative(value: f64) -> f64 {
    value.max(0.0)
}

/// RFC 3339 strings or Unix timestamps (seconds, or milliseconds when large).
fn first_timestamp(record: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    keys.iter().find_map(|k| match record.get(*k)? {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => {
            let raw = n.as_i64()?;
            let secs = if raw > 100_000_000_000 { raw / 1000 } else { raw };
            Utc.timestamp_opt(secs, 0).single()
        }
        _ => None,
    })
}

fn multiplayer_features(record: &Value) -> MultiplayerFeatures {
    let flag = |source: &Value, keys: &[&str]| {
        keys.iter()
            .any(|k| source.get(*k).and_then(Value::as_bool) == Some(true))
    };

    match record.get("multiplayer") {
        Some(nested @ Value::Object(_)) => MultiplayerFeatures {
            online: flag(nested, &["online"]),
            local_coop: flag(nested, &["localCoop", "local_coop", "coop"]),
            competitive: flag(nested, &["competitive", "pvp"]),
        },
        Some(Value::Bool(true)) => MultiplayerFeatures {
            online: true,
            ..MultiplayerFeatures::default()
        },
        _ => MultiplayerFeatures {
            online: flag(record, &["online", "isOnline"]),
            local_coop: flag(record, &["localCoop", "local_coop"]),
            competitive: flag(record, &["competitive", "pvp"]),
        },
    }
}
