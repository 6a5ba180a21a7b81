//! Core data model for the persona engine.
//!
//! Defines the normalized [`ContentItem`] the engine reads, the derived
//! [`RawSignals`] and [`PersonaSnapshot`] values, and the persisted
//! [`IdentitySnapshot`] history record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a piece of content sits in the player's library lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayStatus {
    #[default]
    Unplayed,
    Playing,
    Completed,
    Backlog,
    Abandoned,
}

impl PlayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unplayed => "unplayed",
            Self::Playing => "playing",
            Self::Completed => "completed",
            Self::Backlog => "backlog",
            Self::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for PlayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlayStatus {
    type Err = String;

    /// Accepts the canonical names plus a few common library spellings
    /// ("not started", "in progress", "finished", "dropped").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "unplayed" | "not_started" | "new" => Ok(Self::Unplayed),
            "playing" | "in_progress" | "current" => Ok(Self::Playing),
            "completed" | "finished" | "beaten" | "done" => Ok(Self::Completed),
            "backlog" | "wishlist" | "queued" => Ok(Self::Backlog),
            "abandoned" | "dropped" | "shelved" => Ok(Self::Abandoned),
            _ => Err(format!("unknown play status: {s}")),
        }
    }
}

/// Multiplayer capabilities advertised by a piece of content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiplayerFeatures {
    pub online: bool,
    pub local_coop: bool,
    pub competitive: bool,
}

impl MultiplayerFeatures {
    pub fn any(&self) -> bool {
        self.online || self.local_coop || self.competitive
    }
}

/// Session-length bucket inferred from recorded playtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionLength {
    Short,
    Medium,
    Long,
}

impl SessionLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }

    /// Representative session length in minutes for a user-selected bucket.
    pub fn minutes(&self) -> f64 {
        match self {
            Self::Short => 30.0,
            Self::Medium => 60.0,
            Self::Long => 120.0,
        }
    }

    /// Bucket for a single item: short under half an hour, long over two hours.
    pub fn from_playtime_hours(hours: f64) -> Self {
        if hours < 0.5 {
            Self::Short
        } else if hours > 2.0 {
            Self::Long
        } else {
            Self::Medium
        }
    }
}

impl std::fmt::Display for SessionLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionLength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "medium" => Ok(Self::Medium),
            "long" => Ok(Self::Long),
            _ => Err(format!("unknown session length: {s}")),
        }
    }
}

/// One of four time-of-day buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    LateNight,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 4] = [
        TimeOfDay::Morning,
        TimeOfDay::Afternoon,
        TimeOfDay::Evening,
        TimeOfDay::LateNight,
    ];

    /// Morning `[5,12)`, afternoon `[12,17)`, evening `[17,22)`, late night otherwise.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=21 => Self::Evening,
            _ => Self::LateNight,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::LateNight => "late_night",
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            "late_night" | "latenight" | "night" => Ok(Self::LateNight),
            _ => Err(format!("unknown time of day: {s}")),
        }
    }
}

/// A normalized library entry. Every string collection is lowercase and trimmed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    /// Genre-like category tags.
    pub genres: Vec<String>,
    /// Free-text tags.
    pub tags: Vec<String>,
    pub moods: Vec<String>,
    pub playtime_hours: f64,
    /// Completion in `[0, 100]`.
    pub completion_percent: f64,
    pub status: PlayStatus,
    pub session_count: u32,
    pub last_played: Option<DateTime<Utc>>,
    pub multiplayer: MultiplayerFeatures,
    /// Pre-tagged session bucket; inferred from playtime when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_length: Option<SessionLength>,
    /// Pre-tagged recommended times; inferred by auto-tagging when empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommended_times: Vec<TimeOfDay>,
}

impl ContentItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Genres, tags and moods in that order.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.genres
            .iter()
            .chain(self.tags.iter())
            .chain(self.moods.iter())
            .map(String::as_str)
    }

    /// True if any keyword contains any of `needles` (case-insensitive substring).
    pub fn mentions_any(&self, needles: &[&str]) -> bool {
        self.keywords().any(|k| {
            let k = k.to_lowercase();
            needles.iter().any(|n| k.contains(n))
        })
    }
}

/// Flat behavioral signals derived from a library. Recomputed on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSignals {
    /// Category tag → accumulated playtime hours.
    pub playtime_by_category: BTreeMap<String, f64>,
    pub average_session_minutes: f64,
    pub sessions_per_week: u32,
    /// Share of items with multiplayer features, in `[0, 1]`.
    pub multiplayer_ratio: f64,
    /// Share of played items last touched late at night, in `[0, 1]`.
    pub late_night_ratio: f64,
    /// Share of items marked completed, in `[0, 1]`.
    pub completion_rate: f64,
    /// Mood label → accumulated playtime hours.
    pub mood_distribution: BTreeMap<String, f64>,
    pub item_count: usize,
    pub total_sessions: u32,
}

impl RawSignals {
    /// Neutral signals used when a library is empty or extraction fails.
    pub fn fallback() -> Self {
        Self {
            playtime_by_category: BTreeMap::new(),
            average_session_minutes: super::signals::DEFAULT_SESSION_MINUTES,
            sessions_per_week: super::signals::DEFAULT_SESSIONS_PER_WEEK,
            multiplayer_ratio: 0.0,
            late_night_ratio: 0.0,
            completion_rate: 0.0,
            mood_distribution: BTreeMap::new(),
            item_count: 0,
            total_sessions: 0,
        }
    }

    pub fn total_playtime_hours(&self) -> f64 {
        self.playtime_by_category.values().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl std::str::FromStr for Intensity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("unknown intensity: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    /// Sessions under 45 minutes.
    Burst,
    /// 45 to 90 minutes.
    Flow,
    /// Over 90 minutes.
    Marathon,
}

impl Pacing {
    pub fn session_length(&self) -> SessionLength {
        match self {
            Self::Burst => SessionLength::Short,
            Self::Flow => SessionLength::Medium,
            Self::Marathon => SessionLength::Long,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialStyle {
    Solo,
    Coop,
    Competitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    /// Sticks to one familiar category.
    Comfort,
    Balanced,
    /// Spreads across many categories without finishing much.
    Explorer,
}

/// Named persona archetype, picked by the builder from an ordered rule list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Archetype {
    Competitor,
    SocialButterfly,
    Completionist,
    Marathoner,
    Explorer,
    Snacker,
    Wanderer,
}

impl Archetype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Competitor => "competitor",
            Self::SocialButterfly => "social-butterfly",
            Self::Completionist => "completionist",
            Self::Marathoner => "marathoner",
            Self::Explorer => "explorer",
            Self::Snacker => "snacker",
            Self::Wanderer => "wanderer",
        }
    }

    /// Display name used in narratives.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Competitor => "The Competitor",
            Self::SocialButterfly => "The Social Butterfly",
            Self::Completionist => "The Completionist",
            Self::Marathoner => "The Marathoner",
            Self::Explorer => "The Explorer",
            Self::Snacker => "The Snacker",
            Self::Wanderer => "The Wanderer",
        }
    }
}

impl std::fmt::Display for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A self-reported or sensed current mood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodObservation {
    pub mood: String,
    pub intensity: Intensity,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
}

/// Derived persona trait vector. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaSnapshot {
    pub archetype: Archetype,
    pub intensity: Intensity,
    pub pacing: Pacing,
    pub social_style: SocialStyle,
    pub risk_profile: RiskProfile,
    /// Up to three moods by playtime; an observed mood is moved to the front.
    pub dominant_moods: Vec<String>,
    /// Confidence in `[0, 1]`, grows with data volume.
    pub confidence: f64,
}

/// Recognized recent play patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayPattern {
    Completionist,
    Explorer,
    Marathoner,
    Social,
    NightOwl,
    Dedicated,
}

impl PlayPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completionist => "completionist",
            Self::Explorer => "explorer",
            Self::Marathoner => "marathoner",
            Self::Social => "social",
            Self::NightOwl => "night_owl",
            Self::Dedicated => "dedicated",
        }
    }
}

impl std::fmt::Display for PlayPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item that helped define a snapshot, with its identity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityItem {
    pub id: String,
    pub title: String,
    pub score: f64,
}

/// A persisted history record. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    /// UUID v7 (time-sortable).
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub dominant_moods: Vec<String>,
    pub preferred_session_length: SessionLength,
    pub preferred_times: Vec<TimeOfDay>,
    #[serde(default)]
    pub recent_patterns: Vec<PlayPattern>,
    #[serde(default)]
    pub completion_rate: f64,
    #[serde(default)]
    pub multiplayer_ratio: f64,
    #[serde(default)]
    pub average_session_minutes: f64,
    #[serde(default)]
    pub top_items: Vec<IdentityItem>,
    /// Mood → share of playtime (0..100) at snapshot time.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mood_affinity: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archetype: Option<Archetype>,
    pub narrative: String,
    #[serde(default)]
    pub full_narrative: String,
}
