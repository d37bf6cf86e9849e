use crate::emotion::domain::emotion::{Emotion, EmotionScores};
use crate::emotion::domain::learning_state::{classify, LearningState};
use crate::shared::face_region::FaceRegion;

/// Outcome of analysing one frame.
///
/// Only constructible through [`no_face`](Self::no_face),
/// [`scoring_failed`](Self::scoring_failed) and [`scored`](Self::scored),
/// which keeps the field combinations consistent: without a face nothing
/// else is present, and a dominant label and learning state exist exactly
/// when scores do.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisResult {
    face_detected: bool,
    face_region: Option<FaceRegion>,
    scores: Option<EmotionScores>,
    dominant_label: Option<Emotion>,
    learning_state: Option<LearningState>,
}

impl AnalysisResult {
    /// No face visible. The normal, non-error outcome.
    pub fn no_face() -> Self {
        Self {
            face_detected: false,
            face_region: None,
            scores: None,
            dominant_label: None,
            learning_state: None,
        }
    }

    /// A face was found but the scorer could not produce scores.
    pub fn scoring_failed(region: FaceRegion) -> Self {
        Self {
            face_detected: true,
            face_region: Some(region),
            scores: None,
            dominant_label: None,
            learning_state: None,
        }
    }

    /// A face with scores. Empty scores are treated as a scoring failure.
    pub fn scored(region: FaceRegion, scores: EmotionScores) -> Self {
        let Some(dominant) = scores.dominant() else {
            return Self::scoring_failed(region);
        };
        let state = classify(&scores);
        Self {
            face_detected: true,
            face_region: Some(region),
            scores: Some(scores),
            dominant_label: Some(dominant),
            learning_state: Some(state),
        }
    }

    pub fn face_detected(&self) -> bool {
        self.face_detected
    }

    pub fn face_region(&self) -> Option<FaceRegion> {
        self.face_region
    }

    pub fn scores(&self) -> Option<&EmotionScores> {
        self.scores.as_ref()
    }

    pub fn dominant_label(&self) -> Option<Emotion> {
        self.dominant_label
    }

    pub fn learning_state(&self) -> Option<LearningState> {
        self.learning_state
    }

    /// Face found but unscored; consumers keep their previous state.
    pub fn is_transient_failure(&self) -> bool {
        self.face_detected && self.scores.is_none()
    }
}
