use thiserror::Error;

use crate::emotion::domain::emotion::EmotionScores;
use crate::shared::frame::Frame;

/// Hard failure of an emotion scorer, distinct from "no face".
#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("emotion inference failed: {0}")]
    Inference(String),
    #[error("emotion model produced no scores")]
    EmptyScores,
    #[error("face crop is empty")]
    InvalidCrop,
}

impl From<ort::Error> for ScoreError {
    fn from(e: ort::Error) -> Self {
        ScoreError::Inference(e.to_string())
    }
}

/// Domain interface for emotion scoring of a cropped face image.
///
/// Backends are interchangeable and selected at construction time.
/// Implementations may hold inference sessions that need exclusive
/// access, hence `&mut self`.
pub trait EmotionScorer: Send {
    fn score(&mut self, face: &Frame) -> Result<EmotionScores, ScoreError>;
}
