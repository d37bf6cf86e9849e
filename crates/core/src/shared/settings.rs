use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::emotion::infrastructure::scorer_factory::ScorerBackend;
use crate::shared::constants::APP_DIR_NAME;

/// User-level defaults shared by the overlay and server front ends.
///
/// Persisted as JSON; command-line flags override individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Face detection confidence threshold, 0-100.
    pub confidence: u32,
    pub scorer: ScorerBackend,
    /// Emotion model file; required for backends without a download URL.
    pub emotion_model: Option<PathBuf>,
    /// Delay before retrying after a failed frame read.
    pub retry_delay_ms: u64,
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            confidence: 50,
            scorer: ScorerBackend::FerPlus,
            emotion_model: None,
            retry_delay_ms: 10,
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("settings.json"))
    }

    /// Loads settings from the user config dir, falling back to defaults.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Loads settings from `path`; missing or malformed files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&json) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring malformed settings at {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Confidence as a 0.0-1.0 fraction.
    pub fn confidence_fraction(&self) -> f64 {
        self.confidence.min(100) as f64 / 100.0
    }
}
