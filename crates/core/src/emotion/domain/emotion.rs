use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// The fixed set of emotion labels.
///
/// Declaration order is the tie-break priority: when two labels share the
/// maximum intensity, the one declared first is dominant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Emotion {
    Happy,
    Sad,
    Neutral,
    Angry,
    Disgust,
    Fear,
    Surprise,
}

impl Emotion {
    /// All labels in tie-break priority order.
    pub const ALL: [Emotion; 7] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Neutral,
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Surprise,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Neutral => "neutral",
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-label emotion intensities for one face.
///
/// Missing labels read as 0. Negative and non-finite inputs are stored as 0
/// so every stored intensity is a non-negative finite number. Scale is not
/// guaranteed to be comparable across scorer calls.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmotionScores {
    values: BTreeMap<Emotion, f64>,
}

impl EmotionScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Emotion, f64)>,
    {
        let mut scores = Self::new();
        for (emotion, value) in pairs {
            scores.set(emotion, value);
        }
        scores
    }

    pub fn set(&mut self, emotion: Emotion, value: f64) {
        let sanitized = if value.is_finite() { value.max(0.0) } else { 0.0 };
        self.values.insert(emotion, sanitized);
    }

    /// Intensity for `emotion`; 0 when the label is absent.
    pub fn get(&self, emotion: Emotion) -> f64 {
        self.values.get(&emotion).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Present labels with their intensities, in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        self.values.iter().map(|(e, v)| (*e, *v))
    }

    /// Label with the highest intensity; earlier labels in [`Emotion::ALL`]
    /// win ties. Absent labels compete at 0. `None` only for empty scores.
    pub fn dominant(&self) -> Option<Emotion> {
        if self.values.is_empty() {
            return None;
        }
        let mut best = (Emotion::ALL[0], self.get(Emotion::ALL[0]));
        for emotion in &Emotion::ALL[1..] {
            let value = self.get(*emotion);
            if value > best.1 {
                best = (*emotion, value);
            }
        }
        Some(best.0)
    }
}

/// Serialized as a plain `{label: number}` map in priority order.
impl Serialize for EmotionScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (emotion, value) in self.iter() {
            map.serialize_entry(emotion.as_str(), &value)?;
        }
        map.end()
    }
}
