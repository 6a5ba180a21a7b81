//! CLI `history list` and `history show`: browse stored snapshots.

use anyhow::{bail, Result};

use playsona::persona::PersonaEngine;

pub fn list(engine: &PersonaEngine, json: bool) -> Result<()> {
    let snapshots = engine.history().list()?;
    if json {
        return super::print_json(&snapshots);
    }
    if snapshots.is_empty() {
        println!("No snapshots recorded yet.");
        return Ok(());
    }

    println!("{:<36}  {:<10}  {:<24}  Narrative", "ID", "Date", "Moods");
    for s in &snapshots {
        println!(
            "{:<36}  {:<10}  {:<24}  {}",
            s.id,
            s.timestamp.format("%Y-%m-%d").to_string(),
            super::truncate(&s.dominant_moods.join(", "), 24),
            super::truncate(&s.narrative, 60)
        );
    }
    Ok(())
}

/// Display full details for a single snapshot.
pub fn show(engine: &PersonaEngine, id: &str, json: bool) -> Result<()> {
    let Some(s) = engine.history().get(id)? else {
        bail!("snapshot not found: {id}");
    };
    if json {
        return super::print_json(&s);
    }

    println!("Snapshot: {}", s.id);
    println!("{}", "=".repeat(50));
    println!("  Recorded:         {}", s.timestamp.to_rfc3339());
    if let Some(archetype) = s.archetype {
        println!("  Archetype:        {}", archetype.label());
    }
    println!("  Moods:            {}", s.dominant_moods.join(", "));
    println!("  Session length:   {}", s.preferred_session_length);
    let times: Vec<&str> = s.preferred_times.iter().map(|t| t.as_str()).collect();
    println!("  Preferred times:  {}", times.join(", "));
    if !s.recent_patterns.is_empty() {
        let patterns: Vec<&str> = s.recent_patterns.iter().map(|p| p.as_str()).collect();
        println!("  Patterns:         {}", patterns.join(", "));
    }
    println!("  Completion rate:  {:.0}%", s.completion_rate * 100.0);
    println!("  Multiplayer:      {:.0}%", s.multiplayer_ratio * 100.0);
    println!("  Avg session:      {:.0} min", s.average_session_minutes);

    if !s.top_items.is_empty() {
        println!();
        println!("Top games:");
        for item in &s.top_items {
            println!("  {:<32} {:>6.1}", super::truncate(&item.title, 32), item.score);
        }
    }

    println!();
    println!("Story:");
    let story = if s.full_narrative.is_empty() { &s.narrative } else { &s.full_narrative };
    println!("  {story}");
    Ok(())
}
