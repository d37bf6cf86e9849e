use std::time::Instant;

use crate::analysis::analysis_result::AnalysisResult;
use crate::analysis::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::detection::domain::face_locator::FaceLocator;
use crate::emotion::domain::emotion_scorer::{EmotionScorer, ScoreError};
use crate::shared::frame::Frame;

/// Runs face location and emotion scoring for one frame at a time.
///
/// External failures are caught here and folded into the result: a locator
/// error reads as "no face", a scorer error as a transient failure that
/// keeps the face region. `analyze` therefore never fails.
pub struct AnalysisPipeline {
    locator: Box<dyn FaceLocator>,
    scorer: Box<dyn EmotionScorer>,
    logger: Box<dyn PipelineLogger>,
    analysed: usize,
    face_visible: bool,
}

impl AnalysisPipeline {
    pub fn new(locator: Box<dyn FaceLocator>, scorer: Box<dyn EmotionScorer>) -> Self {
        Self {
            locator,
            scorer,
            logger: Box::new(NullPipelineLogger),
            analysed: 0,
            face_visible: false,
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn analyze(&mut self, frame: &Frame) -> AnalysisResult {
        let started = Instant::now();
        let result = self.run_stages(frame);

        self.analysed += 1;
        self.logger.timing("analyze", elapsed_ms(started));
        self.logger
            .metric("face_detected", if result.face_detected() { 1.0 } else { 0.0 });
        self.logger.progress(self.analysed);

        if result.face_detected() != self.face_visible {
            self.face_visible = result.face_detected();
            let message = if self.face_visible {
                format!("Face found at frame {}", frame.index())
            } else {
                format!("Face lost at frame {}", frame.index())
            };
            self.logger.info(&message);
        }
        result
    }

    /// Emits the logger's end-of-run summary.
    pub fn log_summary(&self) {
        self.logger.summary();
    }

    fn run_stages(&mut self, frame: &Frame) -> AnalysisResult {
        let t = Instant::now();
        let located = self.locator.locate(frame);
        self.logger.timing("locate", elapsed_ms(t));

        let region = match located {
            Ok(Some(region)) => region,
            Ok(None) => return AnalysisResult::no_face(),
            Err(e) => {
                log::warn!("Face location failed on frame {}: {e}", frame.index());
                return AnalysisResult::no_face();
            }
        };

        let t = Instant::now();
        let scored = match frame.crop(&region) {
            Some(face) => self.scorer.score(&face),
            None => Err(ScoreError::InvalidCrop),
        };
        self.logger.timing("score", elapsed_ms(t));

        match scored {
            Ok(scores) if !scores.is_empty() => AnalysisResult::scored(region, scores),
            Ok(_) => {
                log::warn!("Emotion scoring failed on frame {}: {}", frame.index(), ScoreError::EmptyScores);
                AnalysisResult::scoring_failed(region)
            }
            Err(e) => {
                log::warn!("Emotion scoring failed on frame {}: {e}", frame.index());
                AnalysisResult::scoring_failed(region)
            }
        }
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::detection::domain::face_locator::LocateError;
    use crate::emotion::domain::emotion::{Emotion, EmotionScores};
    use crate::emotion::domain::learning_state::LearningState;
    use crate::shared::face_region::FaceRegion;

    // ── Stubs ────────────────────────────────────────────────────────

    /// Reports a fixed region whenever the frame has any non-black pixel.
    struct BrightnessLocator {
        region: FaceRegion,
    }

    impl FaceLocator for BrightnessLocator {
        fn locate(&mut self, frame: &Frame) -> Result<Option<FaceRegion>, LocateError> {
            if frame.data().iter().any(|&v| v > 0) {
                Ok(Some(self.region))
            } else {
                Ok(None)
            }
        }
    }

    struct FailingLocator;

    impl FaceLocator for FailingLocator {
        fn locate(&mut self, _frame: &Frame) -> Result<Option<FaceRegion>, LocateError> {
            Err(LocateError::Inference("backend crashed".into()))
        }
    }

    struct StubScorer {
        result: Result<EmotionScores, ()>,
        seen_sizes: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    impl StubScorer {
        fn returning(pairs: &[(Emotion, f64)]) -> Self {
            Self {
                result: Ok(EmotionScores::from_pairs(pairs.iter().copied())),
                seen_sizes: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing() -> Self {
            Self {
                result: Err(()),
                seen_sizes: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl EmotionScorer for StubScorer {
        fn score(&mut self, face: &Frame) -> Result<EmotionScores, ScoreError> {
            self.seen_sizes
                .lock()
                .unwrap()
                .push((face.width(), face.height()));
            self.result
                .clone()
                .map_err(|_| ScoreError::Inference("model exploded".into()))
        }
    }

    fn frame(value: u8) -> Frame {
        Frame::new(vec![value; 100 * 80 * 3], 100, 80, 3, 7)
    }

    fn locator() -> Box<dyn FaceLocator> {
        Box::new(BrightnessLocator {
            region: FaceRegion::new(10, 20, 30, 40),
        })
    }

    fn all_labels(overrides: &[(Emotion, f64)]) -> Vec<(Emotion, f64)> {
        Emotion::ALL
            .iter()
            .map(|&e| {
                let v = overrides
                    .iter()
                    .find(|(o, _)| *o == e)
                    .map(|(_, v)| *v)
                    .unwrap_or(0.0);
                (e, v)
            })
            .collect()
    }

    fn assert_no_face(result: &AnalysisResult) {
        assert!(!result.face_detected());
        assert!(result.face_region().is_none());
        assert!(result.scores().is_none());
        assert!(result.dominant_label().is_none());
        assert!(result.learning_state().is_none());
    }

    // ── No face ──────────────────────────────────────────────────────

    #[test]
    fn test_black_frame_yields_no_face() {
        let scorer = StubScorer::returning(&[(Emotion::Happy, 90.0)]);
        let seen = scorer.seen_sizes.clone();
        let mut pipeline = AnalysisPipeline::new(locator(), Box::new(scorer));

        assert_no_face(&pipeline.analyze(&frame(0)));
        assert!(seen.lock().unwrap().is_empty(), "scorer must not run without a face");
    }

    #[test]
    fn test_locator_failure_yields_no_face() {
        let scorer = StubScorer::returning(&[(Emotion::Happy, 90.0)]);
        let mut pipeline = AnalysisPipeline::new(Box::new(FailingLocator), Box::new(scorer));

        assert_no_face(&pipeline.analyze(&frame(200)));
    }

    // ── Scored faces ─────────────────────────────────────────────────

    #[test]
    fn test_happy_face_is_engaged() {
        let scorer = StubScorer::returning(&all_labels(&[(Emotion::Happy, 90.0)]));
        let mut pipeline = AnalysisPipeline::new(locator(), Box::new(scorer));

        let result = pipeline.analyze(&frame(200));
        assert!(result.face_detected());
        assert_eq!(result.face_region(), Some(FaceRegion::new(10, 20, 30, 40)));
        assert_eq!(result.dominant_label(), Some(Emotion::Happy));
        assert_eq!(result.learning_state(), Some(LearningState::Engaged));
    }

    #[test]
    fn test_tie_resolves_to_priority_label() {
        let scorer = StubScorer::returning(&all_labels(&[
            (Emotion::Happy, 50.0),
            (Emotion::Sad, 50.0),
        ]));
        let mut pipeline = AnalysisPipeline::new(locator(), Box::new(scorer));

        for _ in 0..5 {
            assert_eq!(
                pipeline.analyze(&frame(200)).dominant_label(),
                Some(Emotion::Happy)
            );
        }
    }

    #[test]
    fn test_scorer_receives_cropped_face() {
        let scorer = StubScorer::returning(&[(Emotion::Neutral, 10.0)]);
        let seen = scorer.seen_sizes.clone();
        let mut pipeline = AnalysisPipeline::new(locator(), Box::new(scorer));

        pipeline.analyze(&frame(200));
        assert_eq!(*seen.lock().unwrap(), vec![(30, 40)]);
    }

    // ── Scorer failures ──────────────────────────────────────────────

    #[test]
    fn test_scorer_failure_keeps_face_without_scores() {
        let mut pipeline = AnalysisPipeline::new(locator(), Box::new(StubScorer::failing()));

        let result = pipeline.analyze(&frame(200));
        assert!(result.face_detected());
        assert!(result.face_region().is_some());
        assert!(result.scores().is_none());
        assert!(result.is_transient_failure());
    }

    #[test]
    fn test_empty_scores_are_a_failure() {
        let mut pipeline =
            AnalysisPipeline::new(locator(), Box::new(StubScorer::returning(&[])));

        assert!(pipeline.analyze(&frame(200)).is_transient_failure());
    }

    #[test]
    fn test_region_outside_frame_is_a_failure() {
        let outside = Box::new(BrightnessLocator {
            region: FaceRegion::new(500, 500, 10, 10),
        });
        let scorer = StubScorer::returning(&[(Emotion::Happy, 90.0)]);
        let mut pipeline = AnalysisPipeline::new(outside, Box::new(scorer));

        assert!(pipeline.analyze(&frame(200)).is_transient_failure());
    }

    // ── Logging ──────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingLogger {
        stages: Arc<Mutex<Vec<String>>>,
        messages: Arc<Mutex<Vec<String>>>,
    }

    impl PipelineLogger for RecordingLogger {
        fn progress(&mut self, _frames: usize) {}
        fn timing(&mut self, stage: &str, _duration_ms: f64) {
            self.stages.lock().unwrap().push(stage.to_string());
        }
        fn metric(&mut self, _name: &str, _value: f64) {}
        fn info(&mut self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn test_records_stage_timings() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let scorer = StubScorer::returning(&[(Emotion::Happy, 90.0)]);
        let mut pipeline = AnalysisPipeline::new(locator(), Box::new(scorer)).with_logger(
            Box::new(RecordingLogger {
                stages: stages.clone(),
                ..RecordingLogger::default()
            }),
        );

        pipeline.analyze(&frame(200));
        pipeline.analyze(&frame(0));
        assert_eq!(
            *stages.lock().unwrap(),
            vec!["locate", "score", "analyze", "locate", "analyze"]
        );
    }

    #[test]
    fn test_reports_face_visibility_changes_only() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let scorer = StubScorer::returning(&[(Emotion::Happy, 90.0)]);
        let mut pipeline = AnalysisPipeline::new(locator(), Box::new(scorer)).with_logger(
            Box::new(RecordingLogger {
                messages: messages.clone(),
                ..RecordingLogger::default()
            }),
        );

        for (index, value) in [0u8, 200, 200, 0, 0].into_iter().enumerate() {
            pipeline.analyze(&Frame::new(vec![value; 100 * 80 * 3], 100, 80, 3, index));
        }
        assert_eq!(
            *messages.lock().unwrap(),
            vec!["Face found at frame 1", "Face lost at frame 3"]
        );
    }
}
