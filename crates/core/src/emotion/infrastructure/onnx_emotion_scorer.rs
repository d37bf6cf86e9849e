//! Emotion classifiers backed by ONNX Runtime.
//!
//! Both supported model families take a square grayscale face crop and
//! emit one value per class; they differ in input size, tensor layout,
//! pixel scaling and class order, all captured by [`EmotionModelLayout`].
use std::path::Path;

use crate::detection::infrastructure::execution_provider::preferred_execution_providers;
use crate::emotion::domain::emotion::{Emotion, EmotionScores};
use crate::emotion::domain::emotion_scorer::{EmotionScorer, ScoreError};
use crate::shared::constants::INTENSITY_SCALE;
use crate::shared::frame::Frame;

/// Tolerance when deciding whether model outputs are already probabilities.
const PROBABILITY_SUM_TOLERANCE: f32 = 1e-3;

/// Input/output conventions of an emotion classification model.
#[derive(Clone, Debug, PartialEq)]
pub struct EmotionModelLayout {
    pub input_size: usize,
    /// NHWC when true, NCHW otherwise.
    pub channels_last: bool,
    /// Multiplier applied to 0-255 luma values.
    pub pixel_scale: f32,
    /// Output class order; `None` marks classes outside the label set.
    pub classes: Vec<Option<Emotion>>,
}

impl EmotionModelLayout {
    /// FER+ (ONNX model zoo `emotion-ferplus-8`): 64×64, NCHW, raw 0-255,
    /// 8 logits ending in contempt.
    pub fn ferplus() -> Self {
        Self {
            input_size: 64,
            channels_last: false,
            pixel_scale: 1.0,
            classes: vec![
                Some(Emotion::Neutral),
                Some(Emotion::Happy),
                Some(Emotion::Surprise),
                Some(Emotion::Sad),
                Some(Emotion::Angry),
                Some(Emotion::Disgust),
                Some(Emotion::Fear),
                None, // contempt
            ],
        }
    }

    /// FER2013-trained classifiers (mini-Xception family): 48×48, NHWC,
    /// scaled to 0-1, 7 softmax outputs.
    pub fn fer2013() -> Self {
        Self {
            input_size: 48,
            channels_last: true,
            pixel_scale: 1.0 / 255.0,
            classes: vec![
                Some(Emotion::Angry),
                Some(Emotion::Disgust),
                Some(Emotion::Fear),
                Some(Emotion::Happy),
                Some(Emotion::Sad),
                Some(Emotion::Surprise),
                Some(Emotion::Neutral),
            ],
        }
    }
}

pub struct OnnxEmotionScorer {
    session: ort::session::Session,
    layout: EmotionModelLayout,
}

impl OnnxEmotionScorer {
    pub fn new(
        model_path: &Path,
        layout: EmotionModelLayout,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_inter_threads(1)?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;
        Ok(Self { session, layout })
    }
}

impl EmotionScorer for OnnxEmotionScorer {
    fn score(&mut self, face: &Frame) -> Result<EmotionScores, ScoreError> {
        if face.width() == 0 || face.height() == 0 {
            return Err(ScoreError::InvalidCrop);
        }

        let tensor = preprocess(face, &self.layout);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        ensure_outputs(outputs.len())?;
        let array = outputs[0].try_extract_array::<f32>()?;
        let raw = array
            .as_slice()
            .ok_or_else(|| ScoreError::Inference("cannot get output slice".into()))?;

        to_scores(raw, &self.layout.classes)
    }
}

/// Nearest-neighbour resize to the model input, grayscale, scaled.
fn preprocess(face: &Frame, layout: &EmotionModelLayout) -> ndarray::Array4<f32> {
    let size = layout.input_size;
    let src_w = face.width() as usize;
    let src_h = face.height() as usize;

    let shape = if layout.channels_last {
        (1, size, size, 1)
    } else {
        (1, 1, size, size)
    };
    let mut tensor = ndarray::Array4::<f32>::zeros(shape);

    for y in 0..size {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / size as f64) as usize).min(src_h - 1);
        for x in 0..size {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / size as f64) as usize).min(src_w - 1);
            let value = face.luma(src_y, src_x) * layout.pixel_scale;
            if layout.channels_last {
                tensor[[0, y, x, 0]] = value;
            } else {
                tensor[[0, 0, y, x]] = value;
            }
        }
    }

    tensor
}

/// Converts raw class outputs into 0-100 intensities over the label set.
///
/// Logits are softmaxed; outputs that already form a distribution are
/// used as-is. Classes outside the label set are dropped after
/// normalisation, so the remaining intensities may sum to less than 100.
fn ensure_outputs(count: usize) -> Result<(), ScoreError> {
    if count == 0 {
        return Err(ScoreError::Inference("emotion model produced no outputs".into()));
    }
    Ok(())
}

fn to_scores(raw: &[f32], classes: &[Option<Emotion>]) -> Result<EmotionScores, ScoreError> {
    if raw.len() < classes.len() {
        return Err(ScoreError::Inference(format!(
            "expected {} class outputs, got {}",
            classes.len(),
            raw.len()
        )));
    }
    let values = &raw[..classes.len()];
    let probabilities = if is_distribution(values) {
        values.to_vec()
    } else {
        softmax(values)
    };

    let scores = EmotionScores::from_pairs(
        classes
            .iter()
            .zip(probabilities)
            .filter_map(|(class, p)| class.map(|e| (e, p as f64 * INTENSITY_SCALE))),
    );
    if scores.is_empty() {
        return Err(ScoreError::EmptyScores);
    }
    Ok(scores)
}

fn is_distribution(values: &[f32]) -> bool {
    values.iter().all(|v| (0.0..=1.0).contains(v))
        && (values.iter().sum::<f32>() - 1.0).abs() < PROBABILITY_SUM_TOLERANCE
}

fn softmax(values: &[f32]) -> Vec<f32> {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = values.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        exps.iter().map(|e| e / sum).collect()
    } else {
        vec![0.0; values.len()]
    }
}
