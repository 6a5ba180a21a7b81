//! CLI `categorize` command: assign each game to a mood category.

use anyhow::Result;
use std::path::Path;

use playsona::persona::PersonaEngine;

pub fn categorize(engine: &PersonaEngine, library: &Path, validate: bool, json: bool) -> Result<()> {
    let items = super::load_library(library)?;

    if validate {
        let report = engine.validate_categories(&items);
        if json {
            return super::print_json(&report);
        }
        println!("Category Overlap");
        println!("{}", "=".repeat(40));
        println!("  Items:               {}", report.total_items);
        println!("  Overlapping:         {}", report.overlap_count);
        println!("  Uncategorized:       {}", report.uncategorized_count);
        println!(
            "  Overlap ratio:       {:.1}% (acceptable <= {:.1}%)",
            report.overlap_ratio * 100.0,
            report.acceptable_overlap * 100.0
        );
        println!("  Status:              {}", if report.acceptable { "ok" } else { "too much overlap" });
        println!();
        println!("{:<14} {:>8} {:>9}", "Category", "Matches", "Assigned");
        for category in engine.mood_catalog().categories() {
            let matches = report.matches_by_category.get(category.id).copied().unwrap_or(0);
            let assigned = report.assigned_by_category.get(category.id).copied().unwrap_or(0);
            println!("{:<14} {:>8} {:>9}", category.id, matches, assigned);
        }
        return Ok(());
    }

    let assignments = engine.categorize(&items);
    if json {
        return super::print_json(&assignments);
    }

    for category in engine.mood_catalog().categories() {
        let members: Vec<_> = assignments.iter().filter(|a| a.category == category.id).collect();
        if members.is_empty() {
            continue;
        }
        println!("{} ({})", category.id, members.len());
        for assignment in members {
            println!("  {}", assignment.reason);
        }
        println!();
    }
    let uncategorized = items.len() - assignments.len();
    if uncategorized > 0 {
        println!("{uncategorized} game(s) matched no mood category.");
    }
    Ok(())
}
