//! CLI `milestones` command: unlocked milestones and progress on the rest.

use anyhow::Result;

use playsona::persona::PersonaEngine;

pub fn milestones(engine: &PersonaEngine, json: bool) -> Result<()> {
    let rows = engine.milestone_status()?;
    if json {
        return super::print_json(&rows);
    }

    let unlocked = rows.iter().filter(|r| r.unlocked_at.is_some()).count();
    println!("Milestones ({unlocked}/{} unlocked)", rows.len());
    println!("{}", "=".repeat(60));
    for row in &rows {
        let state = match row.unlocked_at {
            Some(at) => format!("unlocked {}", at.format("%Y-%m-%d")),
            None => format!("{:>5.1}%", row.progress),
        };
        println!("  {:<18} {:<12} {:<16} {}", row.title, row.category.as_str(), state, row.description);
    }
    Ok(())
}
