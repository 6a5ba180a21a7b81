use anyhow::Result;

use playsona::persona::PersonaEngine;

/// Display snapshot history statistics in the terminal.
pub fn stats(engine: &PersonaEngine, json: bool) -> Result<()> {
    let stats = engine.history().stats()?;
    if json {
        return super::print_json(&stats);
    }

    println!("History Statistics");
    println!("{}", "=".repeat(40));
    println!("  Snapshots:           {} / {}", stats.count, stats.capacity);
    println!("  Avg completion:      {:.0}%", stats.average_completion_rate * 100.0);
    println!("  Avg multiplayer:     {:.0}%", stats.average_multiplayer_ratio * 100.0);
    println!("  Avg session:         {:.0} min", stats.average_session_minutes);
    println!();

    if !stats.mood_frequency.is_empty() {
        println!("By Mood:");
        let mut moods: Vec<_> = stats.mood_frequency.iter().collect();
        moods.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (mood, count) in moods {
            println!("  {:<12} {}", mood, count);
        }
        println!();
    }

    if let Some(ref mood) = stats.most_common_mood {
        println!("Most common mood:      {mood}");
    }
    if let Some(oldest) = stats.oldest {
        println!("Oldest snapshot:       {}", oldest.to_rfc3339());
    }
    if let Some(newest) = stats.newest {
        println!("Newest snapshot:       {}", newest.to_rfc3339());
    }

    Ok(())
}
