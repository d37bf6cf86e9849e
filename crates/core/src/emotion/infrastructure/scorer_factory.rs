use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::emotion::domain::emotion_scorer::EmotionScorer;

use super::onnx_emotion_scorer::{EmotionModelLayout, OnnxEmotionScorer};

/// Emotion model family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorerBackend {
    /// FER+ from the ONNX model zoo; downloaded on first use.
    FerPlus,
    /// FER2013-trained classifier; the model file must be supplied.
    Fer2013,
}

impl ScorerBackend {
    pub const ALL: [ScorerBackend; 2] = [ScorerBackend::FerPlus, ScorerBackend::Fer2013];

    pub fn as_str(self) -> &'static str {
        match self {
            ScorerBackend::FerPlus => "ferplus",
            ScorerBackend::Fer2013 => "fer2013",
        }
    }

    pub fn layout(self) -> EmotionModelLayout {
        match self {
            ScorerBackend::FerPlus => EmotionModelLayout::ferplus(),
            ScorerBackend::Fer2013 => EmotionModelLayout::fer2013(),
        }
    }

    /// Whether the model can be fetched automatically when no path is given.
    pub fn is_downloadable(self) -> bool {
        matches!(self, ScorerBackend::FerPlus)
    }
}

impl fmt::Display for ScorerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScorerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown scorer '{s}' (expected ferplus or fer2013)"))
    }
}

/// Creates an emotion scorer for `backend` from an already resolved model file.
pub fn create_scorer(
    backend: ScorerBackend,
    model_path: &Path,
) -> Result<Box<dyn EmotionScorer>, Box<dyn std::error::Error>> {
    log::info!("Loading {backend} emotion model from {}", model_path.display());
    let scorer = OnnxEmotionScorer::new(model_path, backend.layout())?;
    Ok(Box::new(scorer))
}
