//! CLI `profile` command: signals and persona for a library.

use anyhow::Result;
use std::path::Path;

use playsona::persona::types::{Intensity, MoodObservation};
use playsona::persona::PersonaEngine;

pub fn profile(engine: &PersonaEngine, library: &Path, mood: Option<&str>, json: bool) -> Result<()> {
    let items = super::load_library(library)?;
    let observation = mood.map(|m| MoodObservation {
        mood: m.to_string(),
        intensity: Intensity::Medium,
        confidence: 1.0,
        observed_at: chrono::Utc::now(),
    });
    let profile = engine.profile(&items, observation.as_ref());

    if json {
        return super::print_json(&profile);
    }

    let p = &profile.persona;
    let s = &profile.signals;
    println!("Persona: {}", p.archetype.label());
    println!("{}", "=".repeat(40));
    println!("  Intensity:           {:?}", p.intensity);
    println!("  Pacing:              {:?}", p.pacing);
    println!("  Social style:        {:?}", p.social_style);
    println!("  Risk profile:        {:?}", p.risk_profile);
    println!("  Dominant moods:      {}", p.dominant_moods.join(", "));
    println!("  Confidence:          {:.2}", p.confidence);
    if profile.fallback_used {
        println!("  (built from fallback signals)");
    }
    println!();

    println!("Signals:");
    println!("  Items:               {}", s.item_count);
    println!("  Sessions:            {}", s.total_sessions);
    println!("  Avg session:         {:.0} min", s.average_session_minutes);
    println!("  Sessions / week:     {}", s.sessions_per_week);
    println!("  Multiplayer ratio:   {:.2}", s.multiplayer_ratio);
    println!("  Late-night ratio:    {:.2}", s.late_night_ratio);
    println!("  Completion rate:     {:.2}", s.completion_rate);

    if !s.playtime_by_category.is_empty() {
        println!();
        println!("Playtime by category:");
        let mut categories: Vec<_> = s.playtime_by_category.iter().collect();
        categories.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (category, hours) in categories.into_iter().take(10) {
            println!("  {:<20} {:.1}h", super::truncate(category, 20), hours);
        }
    }

    Ok(())
}
