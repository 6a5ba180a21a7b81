//! Contextual matching: how well does one item fit the player right now?
//!
//! Items are first tagged ([`tag_item`]) with moods, a session bucket and
//! recommended times of day, inferring whatever the library did not supply.
//! [`score`] then combines a flat base (25 points per satisfied condition)
//! with a weighted persona bonus:
//!
//! ```text
//! score = 25 * (mood + session + time) + persona_bonus * personaWeight
//! persona_bonus = Σ affinity(mood) * moodWeight      (item moods in dominant moods)
//!               + 25 * sessionLengthWeight           (bucket equals preference)
//!               + 20 * timeOfDayWeight               (recommended ∩ preferred times)
//!               + 15 * playPatternWeight per pattern (recognized pattern matches)
//! ```

use serde::Serialize;
use std::collections::BTreeMap;

use super::builder::PersonaProfile;
use super::moods::MoodCatalog;
use super::signals::is_multiplayer;
use super::types::{
    ContentItem, IdentitySnapshot, PlayPattern, PlayStatus, SessionLength, TimeOfDay,
};
use crate::config::TuningConfig;

const POINTS_PER_FLAG: f64 = 25.0;
const SESSION_BONUS: f64 = 25.0;
const TIME_BONUS: f64 = 20.0;
const PATTERN_BONUS: f64 = 15.0;

/// Affinity assumed for a dominant mood with no recorded affinity.
pub const DEFAULT_MOOD_AFFINITY: f64 = 10.0;

/// Aggressiveness cutoffs for each auto-tagging rule.
const LATE_NIGHT_CUTOFF: f64 = 0.3;
const MORNING_CUTOFF: f64 = 0.5;
const DAYTIME_CUTOFF: f64 = 0.7;

const LATE_NIGHT_KEYWORDS: &[&str] = &["horror", "competitive", "multiplayer", "intense", "atmospheric", "story"];
const MORNING_KEYWORDS: &[&str] = &["puzzle", "casual", "chill", "relaxing", "cozy"];
const DAYTIME_KEYWORDS: &[&str] = &["adventure", "action", "rpg", "open world", "social"];

/// An item with every matcher-relevant tag resolved.
#[derive(Debug, Clone)]
pub struct TaggedItem<'a> {
    pub item: &'a ContentItem,
    pub moods: Vec<String>,
    pub session_length: SessionLength,
    pub recommended_times: Vec<TimeOfDay>,
}

/// Resolve moods, session bucket and recommended times for `item`.
///
/// Moods come from the item, or from its mood category when it has none.
pub fn tag_item<'a>(item: &'a ContentItem, catalog: &MoodCatalog, aggressiveness: f64) -> TaggedItem<'a> {
    let moods = if item.moods.is_empty() {
        catalog
            .categorize(item)
            .map(|c| vec![c.category.to_string()])
            .unwrap_or_default()
    } else {
        item.moods.clone()
    };

    let session_length = item
        .session_length
        .unwrap_or_else(|| SessionLength::from_playtime_hours(item.playtime_hours));

    let recommended_times = if item.recommended_times.is_empty() {
        infer_recommended_times(item, aggressiveness)
    } else {
        item.recommended_times.clone()
    };

    TaggedItem {
        item,
        moods,
        session_length,
        recommended_times,
    }
}

/// Keyword-driven time-of-day tagging, gated by `aggressiveness` in `[0, 1]`.
///
/// Higher aggressiveness enables more rules: late night from 0.3, morning
/// from 0.5, afternoon and evening from 0.7. When no rule fires the item is
/// recommended for the evening.
pub fn infer_recommended_times(item: &ContentItem, aggressiveness: f64) -> Vec<TimeOfDay> {
    let mut times = Vec::new();

    if aggressiveness >= LATE_NIGHT_CUTOFF && item.mentions_any(LATE_NIGHT_KEYWORDS) {
        times.push(TimeOfDay::LateNight);
    }
    if aggressiveness >= MORNING_CUTOFF && item.mentions_any(MORNING_KEYWORDS) {
        times.push(TimeOfDay::Morning);
    }
    if aggressiveness >= DAYTIME_CUTOFF && item.mentions_any(DAYTIME_KEYWORDS) {
        times.push(TimeOfDay::Afternoon);
        times.push(TimeOfDay::Evening);
    }

    if times.is_empty() {
        times.push(TimeOfDay::Evening);
    }
    times.sort();
    times.dedup();
    times
}

/// What the player looks like right now, as seen by the matcher.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchContext {
    pub dominant_moods: Vec<String>,
    pub preferred_session: Option<SessionLength>,
    pub preferred_times: Vec<TimeOfDay>,
    /// Mood → affinity (share of playtime, 0..100).
    pub mood_affinity: BTreeMap<String, f64>,
    pub recent_patterns: Vec<PlayPattern>,
    /// Mood the player reported for this session, if any.
    pub current_mood: Option<String>,
}

impl MatchContext {
    /// Context from a stored history record.
    pub fn from_identity(snapshot: &IdentitySnapshot) -> Self {
        Self {
            dominant_moods: snapshot.dominant_moods.clone(),
            preferred_session: Some(snapshot.preferred_session_length),
            preferred_times: snapshot.preferred_times.clone(),
            mood_affinity: snapshot.mood_affinity.clone(),
            recent_patterns: snapshot.recent_patterns.clone(),
            current_mood: None,
        }
    }

    /// Context from a freshly built profile.
    pub fn from_profile(
        profile: &PersonaProfile,
        preferred_times: Vec<TimeOfDay>,
        recent_patterns: Vec<PlayPattern>,
    ) -> Self {
        Self {
            dominant_moods: profile.persona.dominant_moods.clone(),
            preferred_session: Some(profile.persona.pacing.session_length()),
            preferred_times,
            mood_affinity: mood_affinity(&profile.signals.mood_distribution),
            recent_patterns,
            current_mood: None,
        }
    }

    pub fn with_current_mood(mut self, mood: impl Into<String>) -> Self {
        self.current_mood = Some(mood.into().trim().to_lowercase());
        self
    }

    fn affinity(&self, mood: &str) -> f64 {
        self.mood_affinity
            .get(mood)
            .copied()
            .unwrap_or(DEFAULT_MOOD_AFFINITY)
    }
}

/// Share of playtime per mood, scaled to 0..100.
pub fn mood_affinity(distribution: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    let total: f64 = distribution.values().sum();
    if total <= 0.0 {
        return BTreeMap::new();
    }
    distribution
        .iter()
        .map(|(mood, hours)| (mood.clone(), hours / total * 100.0))
        .collect()
}

/// Outcome of scoring one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchScore {
    pub score: f64,
    pub base_score: f64,
    /// Unweighted persona bonus (before `personaWeight`).
    pub persona_bonus: f64,
    pub matches_mood: bool,
    pub matches_session: bool,
    pub matches_time: bool,
    pub pattern_matches: Vec<PlayPattern>,
}

/// Score a tagged item against the context at time-of-day `now`.
pub fn score(tagged: &TaggedItem<'_>, ctx: &MatchContext, now: TimeOfDay, tuning: &TuningConfig) -> MatchScore {
    let tuning = tuning.clamped();

    let matches_mood = tagged.moods.iter().any(|m| {
        ctx.dominant_moods.contains(m) || ctx.current_mood.as_deref() == Some(m.as_str())
    });
    let matches_session = ctx.preferred_session == Some(tagged.session_length);
    let matches_time = tagged.recommended_times.contains(&now);

    let flags = [matches_mood, matches_session, matches_time]
        .iter()
        .filter(|f| **f)
        .count();
    let base_score = POINTS_PER_FLAG * flags as f64;

    let mut persona_bonus = 0.0;
    for mood in tagged.moods.iter().filter(|m| ctx.dominant_moods.contains(m)) {
        persona_bonus += ctx.affinity(mood) * tuning.mood_weight;
    }
    if matches_session {
        persona_bonus += SESSION_BONUS * tuning.session_length_weight;
    }
    if tagged
        .recommended_times
        .iter()
        .any(|t| ctx.preferred_times.contains(t))
    {
        persona_bonus += TIME_BONUS * tuning.time_of_day_weight;
    }
    let pattern_matches: Vec<PlayPattern> = ctx
        .recent_patterns
        .iter()
        .copied()
        .filter(|p| pattern_matches(*p, tagged))
        .collect();
    persona_bonus += PATTERN_BONUS * tuning.play_pattern_weight * pattern_matches.len() as f64;

    MatchScore {
        score: base_score + persona_bonus * tuning.persona_weight,
        base_score,
        persona_bonus,
        matches_mood,
        matches_session,
        matches_time,
        pattern_matches,
    }
}

/// Whether a recognized play pattern pairs with this item.
pub fn pattern_matches(pattern: PlayPattern, tagged: &TaggedItem<'_>) -> bool {
    let item = tagged.item;
    match pattern {
        PlayPattern::Completionist => {
            item.status == PlayStatus::Completed || item.completion_percent >= 90.0
        }
        PlayPattern::Explorer => matches!(item.status, PlayStatus::Unplayed | PlayStatus::Backlog),
        PlayPattern::Marathoner => tagged.session_length == SessionLength::Long,
        PlayPattern::Social => is_multiplayer(item),
        PlayPattern::NightOwl => tagged.recommended_times.contains(&TimeOfDay::LateNight),
        PlayPattern::Dedicated => item.status == PlayStatus::Playing,
    }
}

/// A scored, explained recommendation.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub item_id: String,
    pub title: String,
    #[serde(flatten)]
    pub score: MatchScore,
    pub reasons: Vec<String>,
}

/// Score every item and sort best first. Ties break on title, then id.
pub fn rank(
    items: &[ContentItem],
    ctx: &MatchContext,
    now: TimeOfDay,
    tuning: &TuningConfig,
    catalog: &MoodCatalog,
) -> Vec<Recommendation> {
    let aggressiveness = tuning.clamped().auto_tagging_aggressiveness;

    let mut ranked: Vec<Recommendation> = items
        .iter()
        .map(|item| {
            let tagged = tag_item(item, catalog, aggressiveness);
            let score = score(&tagged, ctx, now, tuning);
            let reasons = explain(&tagged, &score, ctx, now);
            Recommendation {
                item_id: item.id.clone(),
                title: item.title.clone(),
                score,
                reasons,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .score
            .total_cmp(&a.score.score)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    ranked
}

fn explain(tagged: &TaggedItem<'_>, score: &MatchScore, ctx: &MatchContext, now: TimeOfDay) -> Vec<String> {
    let mut reasons = Vec::new();
    if score.matches_mood {
        let mood = tagged
            .moods
            .iter()
            .find(|m| ctx.dominant_moods.contains(m) || ctx.current_mood.as_deref() == Some(m.as_str()))
            .map(String::as_str)
            .unwrap_or_default();
        reasons.push(format!("fits your {mood} mood"));
    }
    if score.matches_session {
        reasons.push(format!("suits a {} session", tagged.session_length));
    }
    if score.matches_time {
        reasons.push(format!("good for the {}", now.as_str().replace('_', " ")));
    }
    for pattern in &score.pattern_matches {
        reasons.push(format!("matches your {} streak", pattern.as_str().replace('_', " ")));
    }
    reasons
}
