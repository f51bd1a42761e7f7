//! Scheduling defaults and global settings loading.
//!
//! Every value an engine falls back to when configuration is missing or
//! malformed lives here, next to the loader for the global settings file.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::settings::EffectiveSettings;

// ==================== Settings File ====================

/// Settings file looked up in the working directory
pub const SETTINGS_FILE: &str = "study.toml";

/// Environment variable naming an alternative settings file
pub const SETTINGS_PATH_ENV: &str = "STUDY_SETTINGS_PATH";

/// Structure of study.toml
#[derive(Debug, Deserialize)]
struct SettingsFile {
    scheduling: Option<EffectiveSettings>,
}

/// Load global settings with priority: study.toml > STUDY_SETTINGS_PATH > defaults.
///
/// A file that cannot be read or parsed is logged and skipped; this never fails.
pub fn load_settings() -> EffectiveSettings {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let env_path = std::env::var(SETTINGS_PATH_ENV).ok().map(PathBuf::from);
    load_settings_in(Path::new("."), env_path.as_deref())
}

/// Same priority chain as [`load_settings`], with study.toml looked up in `dir`
/// and `env_path` standing in for STUDY_SETTINGS_PATH.
pub fn load_settings_in(dir: &Path, env_path: Option<&Path>) -> EffectiveSettings {
    // Priority 1: study.toml
    let local = dir.join(SETTINGS_FILE);
    if local.exists() {
        match load_settings_from(&local) {
            Ok(settings) => {
                tracing::info!("Using scheduling settings from {}", local.display());
                return settings;
            }
            Err(e) => tracing::warn!("Ignoring {}: {}", local.display(), e),
        }
    }

    // Priority 2: STUDY_SETTINGS_PATH
    if let Some(path) = env_path {
        match load_settings_from(path) {
            Ok(settings) => {
                tracing::info!("Using scheduling settings from {}", path.display());
                return settings;
            }
            Err(e) => tracing::warn!("Ignoring {}: {}", path.display(), e),
        }
    }

    tracing::info!("Using default scheduling settings");
    EffectiveSettings::default()
}

/// Read and sanitize a settings file. A file without a [scheduling] table yields defaults.
pub fn load_settings_from(path: &Path) -> Result<EffectiveSettings> {
    let contents = std::fs::read_to_string(path)?;
    let file: SettingsFile = toml::from_str(&contents)?;
    Ok(file.scheduling.unwrap_or_default().sanitized())
}

// ==================== Learning Steps ====================

/// Learning steps for new cards: 1min → 10min
pub const DEFAULT_LEARNING_STEPS: &str = "1m 10m";

/// Relearning steps for lapsed cards
pub const DEFAULT_RELEARNING_STEPS: &str = "10m";

/// Delay used for an unparsable or missing step
pub const DEFAULT_STEP_MINUTES: i64 = 1;

pub const MINUTES_PER_DAY: i64 = 1440;

/// Longest accepted learning step; longer steps are cut to this
pub const MAX_STEP_MINUTES: i64 = DEFAULT_MAXIMUM_INTERVAL as i64 * MINUTES_PER_DAY;

// ==================== FSRS ====================

pub const DEFAULT_REQUESTED_RETENTION: f64 = 0.9;

/// Retention outside this range is replaced with the default
pub const RETENTION_RANGE: (f64, f64) = (0.7, 0.99);

/// Longest interval in days (100 years). Also the ceiling for configured maximums.
pub const DEFAULT_MAXIMUM_INTERVAL: u32 = 36500;

/// FSRS-4.5 default weights
pub const FSRS45_DEFAULT_WEIGHTS: [f32; 17] = [
    0.4872, 1.4003, 3.7145, 13.8206, 5.1618, 1.2298, 0.8975, 0.031, 1.6474, 0.1367, 1.0461,
    2.1072, 0.0793, 0.3246, 1.587, 0.2272, 2.8755,
];

/// Forgetting curve decay used by FSRS-4.5
pub const FSRS45_DECAY: f32 = 0.5;

// ==================== SM-2 ====================

pub const DEFAULT_STARTING_EASE: f64 = 2.5;
pub const MIN_EASINESS_FACTOR: f64 = 1.3;
pub const DEFAULT_EASY_BONUS: f64 = 1.3;
pub const DEFAULT_HARD_INTERVAL_MULTIPLIER: f64 = 1.2;
/// 1.0 = 100%
pub const DEFAULT_INTERVAL_MODIFIER: f64 = 1.0;
/// Share of the previous interval a lapsed card keeps
pub const DEFAULT_LAPSE_INTERVAL_MULTIPLIER: f64 = 0.0;
pub const DEFAULT_LAPSE_EASE_PENALTY: f64 = 0.2;
pub const DEFAULT_GRADUATING_INTERVAL: f64 = 1.0;
pub const DEFAULT_EASY_INTERVAL: f64 = 4.0;
pub const DEFAULT_MINIMUM_INTERVAL: f64 = 1.0;

// ==================== Daily Limits ====================

pub const DEFAULT_NEW_CARDS_PER_DAY: usize = 20;
pub const DEFAULT_MAX_REVIEWS_PER_DAY: usize = 200;

/// How far ahead intraday learning cards may be pulled into a session
pub const DEFAULT_LEARN_AHEAD_MINUTES: i64 = 20;

// ==================== Leeches ====================

pub const DEFAULT_LEECH_THRESHOLD: u32 = 8;

// ==================== Presentation ====================

/// Stability/interval in days at which an item counts as mature
pub const MATURE_THRESHOLD_DAYS: f64 = 21.0;
