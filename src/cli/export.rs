use anyhow::{Context, Result};
use std::path::Path;

use playsona::persona::PersonaEngine;

/// Export the snapshot history as JSON, to a file or stdout.
pub fn export(engine: &PersonaEngine, output: Option<&Path>) -> Result<()> {
    let json = engine.history().export_all()?;
    let count = engine.history().list()?.len();

    match output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write export file: {}", path.display()))?;
            eprintln!("Exported {count} snapshots to {}.", path.display());
        }
        None => {
            println!("{json}");
            eprintln!("Exported {count} snapshots.");
        }
    }
    Ok(())
}
