pub mod categorize;
pub mod export;
pub mod import;
pub mod inspect;
pub mod milestones;
pub mod profile;
pub mod recommend;
pub mod reset;
pub mod snapshot;
pub mod stats;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use playsona::persona::normalize::normalize_library;
use playsona::persona::types::ContentItem;

/// Read a library JSON file and normalize its entries.
pub fn load_library(path: &Path) -> Result<Vec<ContentItem>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read library file: {}", path.display()))?;
    let payload: serde_json::Value =
        serde_json::from_str(&raw).context("failed to parse library JSON")?;

    let items = normalize_library(&payload);
    tracing::debug!(path = %path.display(), items = items.len(), "library loaded");
    Ok(items)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Shorten `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
