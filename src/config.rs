use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PlaysonaConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub tuning: TuningConfig,
    pub history: HistoryConfig,
    pub categorizer: CategorizerConfig,
    pub milestones: MilestonesConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// `"sqlite"` or `"memory"`.
    pub backend: String,
    pub db_path: String,
}

/// Scoring weights for the contextual matcher, each in `[0.0, 1.0]`.
///
/// Field names follow the camelCase tuning contract; snake_case aliases are
/// accepted so the same section reads naturally from TOML.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TuningConfig {
    #[serde(alias = "persona_weight")]
    pub persona_weight: f64,
    #[serde(alias = "mood_weight")]
    pub mood_weight: f64,
    #[serde(alias = "session_length_weight")]
    pub session_length_weight: f64,
    #[serde(alias = "time_of_day_weight")]
    pub time_of_day_weight: f64,
    #[serde(alias = "play_pattern_weight")]
    pub play_pattern_weight: f64,
    #[serde(alias = "auto_tagging_aggressiveness")]
    pub auto_tagging_aggressiveness: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of identity snapshots retained, newest first.
    pub capacity: usize,
    pub snapshot_interval_days: i64,
    /// How many identity-defining items each snapshot keeps.
    pub top_items: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CategorizerConfig {
    /// Largest overlap ratio the validator still reports as acceptable.
    pub acceptable_overlap: f64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MilestonesConfig {
    /// JSON file replacing the built-in milestone catalog.
    pub catalog_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_playsona_dir()
            .join("playsona.db")
            .to_string_lossy()
            .into_owned();
        Self {
            backend: "sqlite".into(),
            db_path,
        }
    }
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            persona_weight: 0.7,
            mood_weight: 0.8,
            session_length_weight: 0.6,
            time_of_day_weight: 0.5,
            play_pattern_weight: 0.4,
            auto_tagging_aggressiveness: 0.5,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            snapshot_interval_days: 7,
            top_items: 5,
        }
    }
}

impl Default for CategorizerConfig {
    fn default() -> Self {
        Self {
            acceptable_overlap: 0.05,
        }
    }
}

impl TuningConfig {
    /// Overlay the keys present in a JSON tuning object onto `self`.
    /// Keys the object leaves out keep their current value.
    pub fn merge_json(&self, json: &str) -> Result<Self> {
        let overlay: TuningOverlay =
            serde_json::from_str(json).context("failed to parse tuning JSON")?;
        Ok(Self {
            persona_weight: overlay.persona_weight.unwrap_or(self.persona_weight),
            mood_weight: overlay.mood_weight.unwrap_or(self.mood_weight),
            session_length_weight: overlay
                .session_length_weight
                .unwrap_or(self.session_length_weight),
            time_of_day_weight: overlay.time_of_day_weight.unwrap_or(self.time_of_day_weight),
            play_pattern_weight: overlay.play_pattern_weight.unwrap_or(self.play_pattern_weight),
            auto_tagging_aggressiveness: overlay
                .auto_tagging_aggressiveness
                .unwrap_or(self.auto_tagging_aggressiveness),
        })
    }

    /// Copy with every weight forced into `[0.0, 1.0]`. Non-finite values become 0.
    pub fn clamped(&self) -> Self {
        Self {
            persona_weight: clamp_unit(self.persona_weight),
            mood_weight: clamp_unit(self.mood_weight),
            session_length_weight: clamp_unit(self.session_length_weight),
            time_of_day_weight: clamp_unit(self.time_of_day_weight),
            play_pattern_weight: clamp_unit(self.play_pattern_weight),
            auto_tagging_aggressiveness: clamp_unit(self.auto_tagging_aggressiveness),
        }
    }
}

/// Partial [`TuningConfig`] read from a tuning file.
#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct TuningOverlay {
    #[serde(alias = "persona_weight")]
    persona_weight: Option<f64>,
    #[serde(alias = "mood_weight")]
    mood_weight: Option<f64>,
    #[serde(alias = "session_length_weight")]
    session_length_weight: Option<f64>,
    #[serde(alias = "time_of_day_weight")]
    time_of_day_weight: Option<f64>,
    #[serde(alias = "play_pattern_weight")]
    play_pattern_weight: Option<f64>,
    #[serde(alias = "auto_tagging_aggressiveness")]
    auto_tagging_aggressiveness: Option<f64>,
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Returns `~/.playsona/`, or `./.playsona/` when no home directory is known.
pub fn default_playsona_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".playsona")
}

/// Returns the default config file path: `~/.playsona/config.toml`
pub fn default_config_path() -> PathBuf {
    default_playsona_dir().join("config.toml")
}

impl PlaysonaConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            PlaysonaConfig::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides (PLAYSONA_DB, PLAYSONA_STORE,
    /// PLAYSONA_LOG_LEVEL, PLAYSONA_TUNING).
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("PLAYSONA_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("PLAYSONA_STORE") {
            self.storage.backend = val;
        }
        if let Ok(val) = std::env::var("PLAYSONA_LOG_LEVEL") {
            self.logging.log_level = val;
        }
        if let Ok(path) = std::env::var("PLAYSONA_TUNING") {
            self.merge_tuning_file(&path)?;
        }
        Ok(())
    }

    /// Merge a JSON tuning file over the current `[tuning]` section.
    fn merge_tuning_file(&mut self, path: &str) -> Result<()> {
        let json = std::fs::read_to_string(expand_tilde(path))
            .with_context(|| format!("failed to read tuning file: {path}"))?;
        self.tuning = self.tuning.merge_json(&json)?;
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
