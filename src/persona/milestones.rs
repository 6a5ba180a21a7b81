//! Milestones: named achievements unlocked by predicates over snapshot history.
//!
//! Each [`MilestoneDefinition`] carries a data-driven [`Requirement`]. Some
//! requirements are boolean (met or not, with a count-based progress), others
//! produce a number compared against a threshold. [`evaluate`] is pure: it
//! reports what would unlock and leaves persistence to [`MilestoneLedger`].

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

use super::types::IdentitySnapshot;
use crate::store::{DocumentStore, MILESTONES_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneCategory {
    Mood,
    Consistency,
    Playstyle,
    Exploration,
}

impl MilestoneCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mood => "mood",
            Self::Consistency => "consistency",
            Self::Playstyle => "playstyle",
            Self::Exploration => "exploration",
        }
    }
}

impl std::fmt::Display for MilestoneCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a milestone asks of the history (newest snapshot first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    /// At least `count` snapshots recorded.
    SnapshotCount { count: usize },
    /// `mood` among the dominant moods of at least `count` snapshots.
    MoodCount { mood: String, count: usize },
    /// At least `count` different moods seen across all snapshots.
    DistinctMoods { count: usize },
    /// Leading mood changed between consecutive snapshots at least `count` times.
    MoodShifts { count: usize },
    /// The `count` most recent snapshots share the same leading mood.
    MoodStreak { count: usize },
    /// Latest completion rate, against `threshold` in `[0, 1]`.
    CompletionRate { threshold: f64 },
    /// Latest multiplayer ratio, against `threshold` in `[0, 1]`.
    MultiplayerRatio { threshold: f64 },
    /// Latest average session minutes, against `threshold`.
    AverageSession { threshold: f64 },
    /// A kind this build does not know about.
    #[serde(other)]
    Unknown,
}

/// Raw result of a requirement before unlock bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Met,
    /// Not yet met; progress in `[0, 100]`.
    Pending(f64),
    /// A numeric value to compare against `threshold`.
    Score { value: f64, threshold: f64 },
    Unknown,
}

impl Requirement {
    pub fn check(&self, history: &[IdentitySnapshot]) -> Outcome {
        match self {
            Self::SnapshotCount { count } => counted(history.len(), *count),
            Self::MoodCount { mood, count } => {
                let seen = history
                    .iter()
                    .filter(|s| s.dominant_moods.iter().any(|m| m == mood))
                    .count();
                counted(seen, *count)
            }
            Self::DistinctMoods { count } => {
                let distinct: BTreeSet<&str> = history
                    .iter()
                    .flat_map(|s| s.dominant_moods.iter().map(String::as_str))
                    .collect();
                counted(distinct.len(), *count)
            }
            Self::MoodShifts { count } => {
                let shifts = history
                    .windows(2)
                    .filter(|pair| match (leading_mood(&pair[0]), leading_mood(&pair[1])) {
                        (Some(a), Some(b)) => a != b,
                        _ => false,
                    })
                    .count();
                counted(shifts, *count)
            }
            Self::MoodStreak { count } => counted(current_streak(history), *count),
            Self::CompletionRate { threshold } => Outcome::Score {
                value: latest(history, |s| s.completion_rate),
                threshold: *threshold,
            },
            Self::MultiplayerRatio { threshold } => Outcome::Score {
                value: latest(history, |s| s.multiplayer_ratio),
                threshold: *threshold,
            },
            Self::AverageSession { threshold } => Outcome::Score {
                value: latest(history, |s| s.average_session_minutes),
                threshold: *threshold,
            },
            Self::Unknown => Outcome::Unknown,
        }
    }
}

fn counted(current: usize, required: usize) -> Outcome {
    if current >= required {
        Outcome::Met
    } else {
        Outcome::Pending(percent(current as f64, required as f64))
    }
}

fn percent(value: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 100.0;
    }
    if !value.is_finite() {
        return 0.0;
    }
    (value / target * 100.0).clamp(0.0, 100.0)
}

fn latest(history: &[IdentitySnapshot], field: impl Fn(&IdentitySnapshot) -> f64) -> f64 {
    history.first().map(field).unwrap_or(0.0)
}

fn leading_mood(snapshot: &IdentitySnapshot) -> Option<&str> {
    snapshot.dominant_moods.first().map(String::as_str)
}

fn current_streak(history: &[IdentitySnapshot]) -> usize {
    let Some(lead) = history.first().and_then(leading_mood) else {
        return 0;
    };
    history
        .iter()
        .take_while(|s| leading_mood(s) == Some(lead))
        .count()
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub icon: String,
    pub category: MilestoneCategory,
    pub requirement: Requirement,
}

impl MilestoneDefinition {
    fn new(
        id: &str,
        title: &str,
        description: &str,
        icon: &str,
        category: MilestoneCategory,
        requirement: Requirement,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            icon: icon.into(),
            category,
            requirement,
        }
    }
}

/// A milestone the player has earned. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockedMilestone {
    pub id: String,
    pub unlocked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    pub category: MilestoneCategory,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationReport {
    pub newly_unlocked: Vec<UnlockedMilestone>,
    /// Milestone id → progress in `[0, 100]`, for every milestone still locked.
    pub progress: BTreeMap<String, f64>,
}

/// Evaluate `catalog` against `history` (newest first).
///
/// Ids in `already_unlocked` are never emitted again and get no progress
/// entry. Duplicate ids within the catalog are evaluated once.
pub fn evaluate(
    history: &[IdentitySnapshot],
    catalog: &[MilestoneDefinition],
    already_unlocked: &HashSet<String>,
    now: DateTime<Utc>,
) -> EvaluationReport {
    let mut report = EvaluationReport::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for definition in catalog {
        if !seen.insert(definition.id.as_str()) || already_unlocked.contains(&definition.id) {
            continue;
        }

        let unlock = |value| UnlockedMilestone {
            id: definition.id.clone(),
            unlocked_at: now,
            value,
            category: definition.category,
        };

        match definition.requirement.check(history) {
            Outcome::Met => report.newly_unlocked.push(unlock(None)),
            Outcome::Pending(progress) => {
                report.progress.insert(definition.id.clone(), progress);
            }
            Outcome::Score { value, threshold } if value.is_finite() && value >= threshold => {
                report.newly_unlocked.push(unlock(Some(value)));
            }
            Outcome::Score { value, threshold } => {
                report
                    .progress
                    .insert(definition.id.clone(), percent(value, threshold));
            }
            Outcome::Unknown => {
                tracing::debug!(id = %definition.id, "unknown milestone requirement");
                report.progress.insert(definition.id.clone(), 0.0);
            }
        }
    }

    report
}

/// Catalog entry joined with its unlock state, for display.
#[derive(Debug, Clone, Serialize)]
pub struct MilestoneStatus {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub category: MilestoneCategory,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub progress: f64,
}

/// Current status of every catalog entry.
pub fn status(
    history: &[IdentitySnapshot],
    catalog: &[MilestoneDefinition],
    unlocked: &[UnlockedMilestone],
    now: DateTime<Utc>,
) -> Vec<MilestoneStatus> {
    let unlocked_ids: HashSet<String> = unlocked.iter().map(|u| u.id.clone()).collect();
    let report = evaluate(history, catalog, &unlocked_ids, now);

    let mut seen = HashSet::new();
    catalog
        .iter()
        .filter(|d| seen.insert(d.id.as_str()))
        .map(|d| {
            let unlocked_at = unlocked
                .iter()
                .find(|u| u.id == d.id)
                .map(|u| u.unlocked_at);
            let progress = if unlocked_at.is_some() {
                100.0
            } else {
                report.progress.get(&d.id).copied().unwrap_or(100.0)
            };
            MilestoneStatus {
                id: d.id.clone(),
                title: d.title.clone(),
                description: d.description.clone(),
                icon: d.icon.clone(),
                category: d.category,
                unlocked_at,
                progress,
            }
        })
        .collect()
}

/// Parse a JSON array of milestone definitions.
pub fn catalog_from_json(json: &str) -> Result<Vec<MilestoneDefinition>> {
    Ok(serde_json::from_str(json)?)
}

/// The built-in catalog.
pub fn default_catalog() -> Vec<MilestoneDefinition> {
    use MilestoneCategory::*;
    use Requirement::*;

    vec![
        MilestoneDefinition::new(
            "first-snapshot",
            "First Impression",
            "Record your first gaming identity snapshot",
            "camera",
            Consistency,
            SnapshotCount { count: 1 },
        ),
        MilestoneDefinition::new(
            "regular",
            "Regular",
            "Record 5 identity snapshots",
            "calendar",
            Consistency,
            SnapshotCount { count: 5 },
        ),
        MilestoneDefinition::new(
            "chronicler",
            "Chronicler",
            "Record 12 identity snapshots",
            "book",
            Consistency,
            SnapshotCount { count: 12 },
        ),
        MilestoneDefinition::new(
            "chill-master",
            "Chill Master",
            "Chill shows up in 5 snapshots",
            "leaf",
            Mood,
            MoodCount { mood: "chill".into(), count: 5 },
        ),
        MilestoneDefinition::new(
            "story-seeker",
            "Story Seeker",
            "Story shows up in 5 snapshots",
            "scroll",
            Mood,
            MoodCount { mood: "story".into(), count: 5 },
        ),
        MilestoneDefinition::new(
            "social-star",
            "Social Star",
            "Social shows up in 5 snapshots",
            "people",
            Mood,
            MoodCount { mood: "social".into(), count: 5 },
        ),
        MilestoneDefinition::new(
            "mood-explorer",
            "Mood Explorer",
            "Experience 5 different moods",
            "compass",
            Exploration,
            DistinctMoods { count: 5 },
        ),
        MilestoneDefinition::new(
            "shapeshifter",
            "Shapeshifter",
            "Change your leading mood 3 times",
            "shuffle",
            Exploration,
            MoodShifts { count: 3 },
        ),
        MilestoneDefinition::new(
            "steady-hand",
            "Steady Hand",
            "Keep the same leading mood for 4 snapshots in a row",
            "anchor",
            Consistency,
            MoodStreak { count: 4 },
        ),
        MilestoneDefinition::new(
            "finisher",
            "Finisher",
            "Reach a 50% completion rate",
            "trophy",
            Playstyle,
            CompletionRate { threshold: 0.5 },
        ),
        MilestoneDefinition::new(
            "party-animal",
            "Party Animal",
            "Play multiplayer in over half your library",
            "controller",
            Playstyle,
            MultiplayerRatio { threshold: 0.5 },
        ),
        MilestoneDefinition::new(
            "marathon-runner",
            "Marathon Runner",
            "Average sessions of 90 minutes or more",
            "hourglass",
            Playstyle,
            AverageSession { threshold: 90.0 },
        ),
    ]
}

/// Persistent set of unlocked milestones under [`MILESTONES_KEY`].
///
/// Records are append-only. Writers hold one mutex across the read, dedupe
/// and append so concurrent evaluations cannot drop each other's unlocks.
pub struct MilestoneLedger {
    store: Arc<dyn DocumentStore>,
    write_lock: Mutex<()>,
}

impl MilestoneLedger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Every stored record. Entries that fail to parse are skipped.
    pub fn unlocked(&self) -> Result<Vec<UnlockedMilestone>> {
        let Some(serde_json::Value::Array(entries)) = self.store.get(MILESTONES_KEY)? else {
            return Ok(Vec::new());
        };
        let total = entries.len();
        let records: Vec<UnlockedMilestone> = entries
            .into_iter()
            .filter_map(|e| serde_json::from_value(e).ok())
            .collect();
        if records.len() < total {
            tracing::warn!(skipped = total - records.len(), "skipped corrupt milestone records");
        }
        Ok(records)
    }

    pub fn unlocked_ids(&self) -> Result<HashSet<String>> {
        Ok(self.unlocked()?.into_iter().map(|m| m.id).collect())
    }

    /// Append records whose id is not already stored. Returns how many were added.
    pub fn record(&self, milestones: &[UnlockedMilestone]) -> Result<usize> {
        let _guard = self.lock()?;
        let mut ids = self.unlocked_ids()?;

        let mut added = 0;
        for milestone in milestones {
            if ids.insert(milestone.id.clone()) {
                self.store
                    .append(MILESTONES_KEY, serde_json::to_value(milestone)?)?;
                added += 1;
            }
        }
        if added > 0 {
            tracing::info!(added, total = ids.len(), "milestones unlocked");
        }
        Ok(added)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| anyhow!("milestone ledger lock poisoned: {e}"))
    }
}
