pub mod builder;
pub mod clock;
pub mod engine;
pub mod events;
pub mod history;
pub mod matcher;
pub mod milestones;
pub mod moods;
pub mod normalize;
pub mod signals;
pub mod types;

pub use engine::{PersonaEngine, RecommendOptions, RefreshOutcome};
