//! CLI `recommend` command: rank the library for right now.

use anyhow::Result;
use std::path::Path;

use playsona::persona::types::{Intensity, MoodObservation, SessionLength};
use playsona::persona::{PersonaEngine, RecommendOptions};

pub struct RecommendArgs<'a> {
    pub library: &'a Path,
    pub limit: usize,
    pub hour: Option<u32>,
    pub mood: Option<&'a str>,
    pub session: Option<SessionLength>,
    pub json: bool,
}

pub fn recommend(engine: &PersonaEngine, args: RecommendArgs<'_>) -> Result<()> {
    let items = super::load_library(args.library)?;
    let options = RecommendOptions {
        limit: Some(args.limit),
        hour: args.hour,
        observation: args.mood.map(|m| MoodObservation {
            mood: m.to_string(),
            intensity: Intensity::Medium,
            confidence: 1.0,
            observed_at: chrono::Utc::now(),
        }),
        session_length: args.session,
    };
    let ranked = engine.recommend(&items, &options);

    if args.json {
        return super::print_json(&ranked);
    }
    if ranked.is_empty() {
        println!("No games to recommend.");
        return Ok(());
    }

    println!("{:>3}  {:<32} {:>7}  Why", "#", "Title", "Score");
    for (rank, rec) in ranked.iter().enumerate() {
        println!(
            "{:>3}  {:<32} {:>7.1}  {}",
            rank + 1,
            super::truncate(&rec.title, 32),
            rec.score.score,
            rec.reasons.join("; ")
        );
    }
    Ok(())
}
