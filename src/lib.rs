//! Playsona: a player persona and contextual recommendation engine for game libraries.
//!
//! Playsona reads a game library, derives behavioral signals from it, and
//! builds a persona: a small trait vector describing how the player plays.
//! The persona drives three features:
//!
//! | Feature | What it does |
//! |---------|--------------|
//! | **Mood categories** | Puts each game in at most one mood (social, competitive, story, adventure, creative, chill) |
//! | **Recommendations** | Scores every game against the player's moods, session length, time of day and play patterns |
//! | **Identity history** | Keeps a bounded log of periodic snapshots and unlocks milestones over it |
//!
//! # Architecture
//!
//! - **Engine**: pure functions (signals → persona → scores) behind an explicit
//!   [`persona::PersonaEngine`] context object; no global state
//! - **Storage**: a key-value [`store::DocumentStore`], backed by SQLite or memory
//! - **Notifications**: history and milestone changes fan out over a broadcast channel
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables, including scoring weights
//! - [`db`]: SQLite database initialization, schema and migrations
//! - [`store`]: Document store trait and its SQLite and in-memory backends
//! - [`persona`]: The engine: normalization, signals, persona, moods, matching, history and milestones

pub mod config;
pub mod db;
pub mod persona;
pub mod store;
