use std::fmt;

use serde::Serialize;

use crate::emotion::domain::emotion::{Emotion, EmotionScores};

pub const ENGAGED_HAPPY_MIN: f64 = 60.0;
pub const DISENGAGED_LOW_AFFECT_MIN: f64 = 70.0;
pub const DISENGAGED_HAPPY_MAX: f64 = 10.0;
pub const FRUSTRATED_NEGATIVE_MIN: f64 = 50.0;
pub const CONFUSED_SURPRISE_MIN: f64 = 60.0;
pub const CONFUSED_NEUTRAL_MAX: f64 = 20.0;

/// Coarse engagement label derived from an emotion-score vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningState {
    Engaged,
    Disengaged,
    Frustrated,
    Confused,
    Uncertain,
}

impl LearningState {
    pub const ALL: [LearningState; 5] = [
        LearningState::Engaged,
        LearningState::Disengaged,
        LearningState::Frustrated,
        LearningState::Confused,
        LearningState::Uncertain,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LearningState::Engaged => "engaged",
            LearningState::Disengaged => "disengaged",
            LearningState::Frustrated => "frustrated",
            LearningState::Confused => "confused",
            LearningState::Uncertain => "uncertain",
        }
    }
}

impl fmt::Display for LearningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps emotion intensities (0-100 scale) to a learning state.
///
/// Rules overlap, so evaluation order is part of the contract: the first
/// matching rule wins. All comparisons are strict.
///
/// 1. `happy > 60` → engaged
/// 2. `sad + neutral > 70 && happy < 10` → disengaged
/// 3. `angry + disgust + fear > 50` → frustrated
/// 4. `surprise > 60 && neutral < 20` → confused
/// 5. otherwise → uncertain
pub fn classify(scores: &EmotionScores) -> LearningState {
    let happy = scores.get(Emotion::Happy);
    let sad = scores.get(Emotion::Sad);
    let neutral = scores.get(Emotion::Neutral);
    let angry = scores.get(Emotion::Angry);
    let disgust = scores.get(Emotion::Disgust);
    let fear = scores.get(Emotion::Fear);
    let surprise = scores.get(Emotion::Surprise);

    if happy > ENGAGED_HAPPY_MIN {
        LearningState::Engaged
    } else if sad + neutral > DISENGAGED_LOW_AFFECT_MIN && happy < DISENGAGED_HAPPY_MAX {
        LearningState::Disengaged
    } else if angry + disgust + fear > FRUSTRATED_NEGATIVE_MIN {
        LearningState::Frustrated
    } else if surprise > CONFUSED_SURPRISE_MIN && neutral < CONFUSED_NEUTRAL_MAX {
        LearningState::Confused
    } else {
        LearningState::Uncertain
    }
}
