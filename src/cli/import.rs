use anyhow::{Context, Result};
use std::path::Path;

use playsona::persona::PersonaEngine;

/// Replace the snapshot history with the valid records of an export file.
///
/// Invalid records are dropped and counted rather than failing the import.
pub fn import(engine: &PersonaEngine, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;

    let report = engine
        .import_history(&json)
        .context("failed to import history")?;

    println!(
        "Import complete: {} snapshots imported, {} dropped.",
        report.imported, report.dropped
    );
    Ok(())
}
