#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use playsona::config::PlaysonaConfig;
use playsona::persona::clock::FixedClock;
use playsona::persona::normalize::normalize_library;
use playsona::persona::types::ContentItem;
use playsona::persona::PersonaEngine;
use playsona::store::memory::MemoryDocumentStore;
use playsona::store::DocumentStore;

/// 2026-03-02 20:00 UTC, a Monday evening.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 20, 0, 0).unwrap()
}

/// A small library in the loosely-typed shape library collaborators produce.
pub fn library_json() -> Value {
    json!({
        "games": [
            {
                "id": "stardew",
                "title": "Stardew Valley",
                "genres": [{"name": "Farming"}, "Simulation"],
                "tags": ["Cozy", "Relaxing"],
                "moods": ["chill"],
                "playtimeHours": 120,
                "completionPercent": 70,
                "status": "playing",
                "sessionCount": 90,
                "lastPlayed": "2026-03-01T21:15:00Z"
            },
            {
                "id": "hades",
                "title": "Hades",
                "genres": ["Action", "Roguelike"],
                "moods": ["adventure"],
                "playtime": "45.5",
                "completion": 100,
                "status": "finished",
                "sessions": 40,
                "lastPlayed": "2026-02-27T23:40:00Z"
            },
            {
                "id": "overcooked",
                "title": "Overcooked 2",
                "genres": ["Party"],
                "tags": ["Local Co-op"],
                "playtimeHours": 8,
                "status": "backlog",
                "multiplayer": {"localCoop": true}
            },
            {
                "id": "tetris",
                "title": "Tetris Effect",
                "genres": ["Puzzle"],
                "playtimeHours": 0.25,
                "sessionCount": 2
            },
            "not a game"
        ]
    })
}

pub fn sample_library() -> Vec<ContentItem> {
    normalize_library(&library_json())
}

/// A library whose only mood is `mood`.
pub fn single_mood_library(mood: &str) -> Vec<ContentItem> {
    let mut item = ContentItem::new(format!("{mood}-game"), format!("{mood} game"));
    item.moods = vec![mood.to_string()];
    item.playtime_hours = 10.0;
    item.session_count = 10;
    vec![item]
}

/// Engine over an in-memory store with a pinned clock.
pub fn test_engine() -> (PersonaEngine, Arc<FixedClock>) {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::default());
    engine_with_store(store)
}

pub fn engine_with_store(store: Arc<dyn DocumentStore>) -> (PersonaEngine, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(fixed_time()));
    let engine = PersonaEngine::new(PlaysonaConfig::default(), store, clock.clone());
    (engine, clock)
}

/// In-memory store whose reads stall, widening any read-modify-write window.
#[derive(Default)]
pub struct SlowStore {
    inner: MemoryDocumentStore,
}

impl DocumentStore for SlowStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let value = self.inner.get(key)?;
        thread::sleep(Duration::from_millis(50));
        Ok(value)
    }

    fn set(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.inner.remove(key)
    }
}
