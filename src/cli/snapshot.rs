//! CLI `snapshot` command: record an identity snapshot when one is due.

use anyhow::Result;
use std::path::Path;

use playsona::persona::PersonaEngine;

pub fn snapshot(engine: &PersonaEngine, library: &Path, force: bool, json: bool) -> Result<()> {
    let items = super::load_library(library)?;
    let outcome = if force {
        engine.record_snapshot(&items)?
    } else {
        engine.refresh(&items)?
    };

    if json {
        return super::print_json(&outcome);
    }

    match &outcome.snapshot {
        Some(s) => {
            println!("Recorded snapshot {}", s.id);
            println!("  {}", s.narrative);
        }
        None => {
            let interval = engine.config().history.snapshot_interval_days;
            println!("No snapshot recorded: the last one is less than {interval} day(s) old (use --force).");
        }
    }
    for milestone in &outcome.newly_unlocked {
        let title = engine
            .milestone_catalog()
            .iter()
            .find(|d| d.id == milestone.id)
            .map(|d| d.title.as_str())
            .unwrap_or(milestone.id.as_str());
        println!("Milestone unlocked: {title}");
    }
    Ok(())
}
