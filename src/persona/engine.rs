//! [`PersonaEngine`]: the context object every engine operation runs through.
//!
//! Holds configuration, the document store, the clock and the event bus.
//! Construct one per process (or per test) and pass it around; there is no
//! global state.

use anyhow::{Context, Result};
use chrono::Timelike;
use serde::Serialize;
use std::sync::Arc;

use super::builder::{build_profile, PersonaProfile};
use super::clock::{Clock, SystemClock};
use super::events::{EngineEvent, EventBus};
use super::history::{self, ImportError, ImportReport, SnapshotHistory};
use super::matcher::{self, MatchContext, Recommendation};
use super::milestones::{self, MilestoneDefinition, MilestoneLedger, MilestoneStatus, UnlockedMilestone};
use super::moods::{Categorization, MoodCatalog, OverlapReport};
use super::types::{ContentItem, IdentitySnapshot, MoodObservation, SessionLength, TimeOfDay};
use crate::config::{expand_tilde, PlaysonaConfig};
use crate::store::{create_store, DocumentStore};

/// Knobs for a single recommendation request.
#[derive(Debug, Clone, Default)]
pub struct RecommendOptions {
    /// Keep only the best `limit` items.
    pub limit: Option<usize>,
    /// Hour of day to recommend for; the clock's hour when absent.
    pub hour: Option<u32>,
    /// Mood the player reports right now.
    pub observation: Option<MoodObservation>,
    /// User-selected session bucket.
    pub session_length: Option<SessionLength>,
}

/// What a refresh (or forced snapshot) did.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub profile: PersonaProfile,
    /// The snapshot recorded during this call, if the policy fired.
    pub snapshot: Option<IdentitySnapshot>,
    pub newly_unlocked: Vec<UnlockedMilestone>,
}

pub struct PersonaEngine {
    config: PlaysonaConfig,
    clock: Arc<dyn Clock>,
    events: EventBus,
    catalog: MoodCatalog,
    milestone_catalog: Vec<MilestoneDefinition>,
    history: SnapshotHistory,
    ledger: MilestoneLedger,
}

impl PersonaEngine {
    pub fn new(config: PlaysonaConfig, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        let history = SnapshotHistory::new(Arc::clone(&store), &config.history);
        let ledger = MilestoneLedger::new(store);
        Self {
            config,
            clock,
            events: EventBus::default(),
            catalog: MoodCatalog::default(),
            milestone_catalog: milestones::default_catalog(),
            history,
            ledger,
        }
    }

    /// Engine over the configured store backend and the system clock.
    ///
    /// A configured `milestones.catalog_path` replaces the built-in catalog.
    pub fn from_config(config: PlaysonaConfig) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = Arc::from(create_store(&config)?);
        let catalog = load_milestone_catalog(&config)?;
        let engine = Self::new(config, store, Arc::new(SystemClock));
        Ok(match catalog {
            Some(catalog) => engine.with_milestones(catalog),
            None => engine,
        })
    }

    /// Replace the built-in milestone catalog.
    pub fn with_milestones(mut self, catalog: Vec<MilestoneDefinition>) -> Self {
        self.milestone_catalog = catalog;
        self
    }

    pub fn config(&self) -> &PlaysonaConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    pub fn ledger(&self) -> &MilestoneLedger {
        &self.ledger
    }

    pub fn mood_catalog(&self) -> &MoodCatalog {
        &self.catalog
    }

    pub fn milestone_catalog(&self) -> &[MilestoneDefinition] {
        &self.milestone_catalog
    }

    /// Signals and persona for `items`. Never fails.
    pub fn profile(&self, items: &[ContentItem], observation: Option<&MoodObservation>) -> PersonaProfile {
        build_profile(items, None, observation)
    }

    pub fn categorize(&self, items: &[ContentItem]) -> Vec<Categorization> {
        self.catalog.categorize_all(items)
    }

    pub fn validate_categories(&self, items: &[ContentItem]) -> OverlapReport {
        self.catalog
            .validate(items, self.config.categorizer.acceptable_overlap)
    }

    /// Rank `items` for the player right now.
    pub fn recommend(&self, items: &[ContentItem], options: &RecommendOptions) -> Vec<Recommendation> {
        let profile = build_profile(items, options.session_length, options.observation.as_ref());
        let mut context = MatchContext::from_profile(
            &profile,
            history::preferred_times(items),
            history::recent_patterns(items, &profile.signals),
        );
        if let Some(obs) = &options.observation {
            context = context.with_current_mood(obs.mood.as_str());
        }

        let now = match options.hour {
            Some(hour) => TimeOfDay::from_hour(hour % 24),
            None => self.clock.time_of_day(),
        };

        let mut ranked = matcher::rank(items, &context, now, &self.config.tuning, &self.catalog);
        if let Some(limit) = options.limit {
            ranked.truncate(limit);
        }
        tracing::debug!(
            items = items.len(),
            returned = ranked.len(),
            time_of_day = %now,
            "recommendations ranked"
        );
        ranked
    }

    /// Rebuild the profile, record a snapshot if one is due, then evaluate
    /// milestones against the resulting history.
    pub fn refresh(&self, items: &[ContentItem]) -> Result<RefreshOutcome> {
        let now = self.clock.now();
        let due = self.history.is_due(now)?;
        self.refresh_inner(items, due)
    }

    /// Like [`refresh`](Self::refresh) but always records a snapshot.
    pub fn record_snapshot(&self, items: &[ContentItem]) -> Result<RefreshOutcome> {
        self.refresh_inner(items, true)
    }

    fn refresh_inner(&self, items: &[ContentItem], take_snapshot: bool) -> Result<RefreshOutcome> {
        let now = self.clock.now();
        let profile = build_profile(items, None, None);

        let snapshot = if take_snapshot {
            let snapshot = history::synthesize_snapshot(items, &profile, now, self.config.history.top_items);
            let count = self.history.save(snapshot.clone())?;
            self.events.publish(EngineEvent::HistoryUpdated { count });
            Some(snapshot)
        } else {
            tracing::debug!(hour = now.hour(), "snapshot not due");
            None
        };

        let newly_unlocked = self.evaluate_milestones()?;
        Ok(RefreshOutcome {
            profile,
            snapshot,
            newly_unlocked,
        })
    }

    /// Evaluate the catalog, persist anything new and notify.
    pub fn evaluate_milestones(&self) -> Result<Vec<UnlockedMilestone>> {
        let history = self.history.list()?;
        let unlocked = self.ledger.unlocked_ids()?;
        let report = milestones::evaluate(&history, &self.milestone_catalog, &unlocked, self.clock.now());

        if !report.newly_unlocked.is_empty() {
            self.ledger.record(&report.newly_unlocked)?;
            let ids: Vec<String> = report.newly_unlocked.iter().map(|m| m.id.clone()).collect();
            for id in &ids {
                tracing::info!(milestone = %id, "milestone unlocked");
            }
            self.events.publish(EngineEvent::MilestonesUpdated { unlocked: ids });
        }
        Ok(report.newly_unlocked)
    }

    pub fn milestone_status(&self) -> Result<Vec<MilestoneStatus>> {
        let history = self.history.list()?;
        let unlocked = self.ledger.unlocked()?;
        Ok(milestones::status(&history, &self.milestone_catalog, &unlocked, self.clock.now()))
    }

    pub fn delete_snapshot(&self, id: &str) -> Result<bool> {
        let removed = self.history.delete(id)?;
        if removed {
            let count = self.history.list()?.len();
            self.events.publish(EngineEvent::HistoryUpdated { count });
        }
        Ok(removed)
    }

    /// Drop the whole history. Unlocked milestones are kept.
    pub fn clear_history(&self) -> Result<()> {
        self.history.clear()?;
        self.events.publish(EngineEvent::HistoryCleared);
        Ok(())
    }

    pub fn import_history(&self, payload: &str) -> Result<ImportReport, ImportError> {
        let report = self.history.import_all(payload)?;
        if report.imported == 0 && report.dropped > 0 {
            tracing::warn!(
                dropped = report.dropped,
                "import accepted no snapshots, history is now empty"
            );
        }
        self.events.publish(EngineEvent::HistoryUpdated { count: report.imported });
        Ok(report)
    }
}

fn load_milestone_catalog(config: &PlaysonaConfig) -> Result<Option<Vec<MilestoneDefinition>>> {
    let Some(path) = &config.milestones.catalog_path else {
        return Ok(None);
    };
    let json = std::fs::read_to_string(expand_tilde(path))
        .with_context(|| format!("failed to read milestone catalog: {path}"))?;
    let catalog = milestones::catalog_from_json(&json)
        .with_context(|| format!("failed to parse milestone catalog: {path}"))?;
    tracing::info!(path = %path, milestones = catalog.len(), "loaded milestone catalog");
    Ok(Some(catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::clock::FixedClock;
    use crate::store::memory::MemoryDocumentStore;
    use chrono::{Duration, TimeZone, Utc};

    fn engine() -> (PersonaEngine, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 2, 1, 20, 0, 0).unwrap()));
        let engine = PersonaEngine::new(
            PlaysonaConfig::default(),
            Arc::new(MemoryDocumentStore::default()),
            clock.clone(),
        );
        (engine, clock)
    }

    fn library() -> Vec<ContentItem> {
        let mut a = ContentItem::new("a", "Stardew Valley");
        a.moods = vec!["chill".into()];
        a.genres = vec!["farming".into()];
        a.playtime_hours = 50.0;
        a.session_count = 60;
        vec![a]
    }

    #[test]
    fn refresh_snapshots_only_when_due() {
        let (engine, clock) = engine();
        let first = engine.refresh(&library()).unwrap();
        assert!(first.snapshot.is_some());

        clock.advance(Duration::days(3));
        let second = engine.refresh(&library()).unwrap();
        assert!(second.snapshot.is_none());

        clock.advance(Duration::days(4));
        assert!(engine.refresh(&library()).unwrap().snapshot.is_some());
        assert_eq!(engine.history().list().unwrap().len(), 2);
    }

    #[test]
    fn first_refresh_unlocks_first_snapshot_once() {
        let (engine, _) = engine();
        let outcome = engine.record_snapshot(&library()).unwrap();
        assert!(outcome.newly_unlocked.iter().any(|m| m.id == "first-snapshot"));

        let again = engine.record_snapshot(&library()).unwrap();
        assert!(again.newly_unlocked.iter().all(|m| m.id != "first-snapshot"));
    }

    #[test]
    fn clear_history_notifies() {
        let (engine, _) = engine();
        engine.record_snapshot(&library()).unwrap();
        let mut rx = engine.events().subscribe();
        engine.clear_history().unwrap();
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::HistoryCleared);
        assert!(engine.history().list().unwrap().is_empty());
    }

    #[test]
    fn from_config_loads_custom_milestone_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("milestones.json");
        std::fs::write(
            &path,
            r#"[{"id": "lone-wolf", "title": "Lone Wolf", "description": "One snapshot",
                "icon": "wolf", "category": "consistency",
                "requirement": {"kind": "snapshot_count", "count": 1}}]"#,
        )
        .unwrap();

        let mut config = PlaysonaConfig::default();
        config.storage.backend = "memory".into();
        config.milestones.catalog_path = Some(path.to_string_lossy().into_owned());

        let engine = PersonaEngine::from_config(config).unwrap();
        let ids: Vec<&str> = engine.milestone_catalog().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["lone-wolf"]);

        let unlocked = engine.record_snapshot(&library()).unwrap().newly_unlocked;
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].id, "lone-wolf");
    }

    #[test]
    fn from_config_reports_missing_catalog_file() {
        let mut config = PlaysonaConfig::default();
        config.storage.backend = "memory".into();
        config.milestones.catalog_path = Some("/nonexistent/milestones.json".into());
        let err = PersonaEngine::from_config(config).err().unwrap();
        assert!(err.to_string().contains("failed to read milestone catalog"));
    }

    #[test]
    fn all_invalid_import_empties_history_and_notifies() {
        let (engine, _) = engine();
        engine.record_snapshot(&library()).unwrap();
        let mut rx = engine.events().subscribe();

        let report = engine.import_history(r#"[{"id": "x"}, 3]"#).unwrap();
        assert_eq!(report, ImportReport { imported: 0, dropped: 2 });
        assert!(engine.history().list().unwrap().is_empty());
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::HistoryUpdated { count: 0 });
    }

    #[test]
    fn recommend_respects_limit_and_hour() {
        let (engine, _) = engine();
        let mut items = library();
        items.push(ContentItem::new("b", "Other"));
        let options = RecommendOptions {
            limit: Some(1),
            hour: Some(9),
            ..RecommendOptions::default()
        };
        let ranked = engine.recommend(&items, &options);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].item_id, "a");
    }
}
