//! CLI `history delete` and `history clear`.

use anyhow::{bail, Result};
use std::io::Write;

use playsona::persona::PersonaEngine;

pub fn delete(engine: &PersonaEngine, id: &str) -> Result<()> {
    if !engine.delete_snapshot(id)? {
        bail!("snapshot not found: {id}");
    }
    println!("Deleted snapshot {id}.");
    Ok(())
}

/// Delete the whole snapshot history after user confirmation.
pub fn clear(engine: &PersonaEngine, yes: bool) -> Result<()> {
    if !yes {
        let count = engine.history().list()?.len();
        println!("WARNING: This will permanently delete all {count} identity snapshots.");
        println!("Unlocked milestones are kept.");
        print!("\nType YES to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim() != "YES" {
            bail!("clear cancelled");
        }
    }

    engine.clear_history()?;
    println!("Snapshot history cleared.");
    Ok(())
}
