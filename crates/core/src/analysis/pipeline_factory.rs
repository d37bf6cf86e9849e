use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::analysis::analysis_pipeline::AnalysisPipeline;
use crate::analysis::pipeline_logger::PipelineLogger;
use crate::detection::infrastructure::onnx_yolo_locator::OnnxYoloLocator;
use crate::emotion::infrastructure::scorer_factory::{create_scorer, ScorerBackend};
use crate::shared::constants::{
    FERPLUS_MODEL_NAME, FERPLUS_MODEL_URL, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use crate::shared::model_resolver::{self, ModelResolveError};
use crate::shared::settings::Settings;

#[derive(Error, Debug)]
pub enum PipelineBuildError {
    #[error(transparent)]
    Resolve(#[from] ModelResolveError),
    #[error("the {0} scorer needs an explicit emotion model path")]
    ModelRequired(ScorerBackend),
    #[error("failed to load model {path}: {message}")]
    Load { path: PathBuf, message: String },
}

/// Builds independent [`AnalysisPipeline`]s.
///
/// Implementations hold no per-pipeline state, so one factory can be
/// shared between connections or threads.
pub trait PipelineFactory: Send + Sync {
    fn build(&self) -> Result<AnalysisPipeline, PipelineBuildError>;
}

/// Model choices for a pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Face detection confidence threshold, 0.0-1.0.
    pub confidence: f64,
    pub scorer: ScorerBackend,
    pub emotion_model: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            confidence: settings.confidence_fraction(),
            scorer: settings.scorer,
            emotion_model: settings.emotion_model.clone(),
        }
    }
}

/// Factory backed by ONNX model files.
///
/// Model files are resolved (and downloaded if needed) once up front;
/// every [`build`](PipelineFactory::build) loads fresh inference sessions
/// so pipelines never share a session.
#[derive(Debug)]
pub struct ModelPipelineFactory {
    face_model: PathBuf,
    emotion_model: PathBuf,
    confidence: f64,
    scorer: ScorerBackend,
}

impl ModelPipelineFactory {
    /// Resolves both model files for `config`.
    ///
    /// `progress` receives `(bytes_downloaded, total_bytes)` for any
    /// download that has to happen.
    pub fn resolve(
        config: &PipelineConfig,
        progress: Option<fn(u64, u64)>,
    ) -> Result<Self, PipelineBuildError> {
        log::info!("Resolving model: {YOLO_MODEL_NAME}");
        let face_model = model_resolver::resolve(
            YOLO_MODEL_NAME,
            YOLO_MODEL_URL,
            None,
            progress.map(|f| Box::new(f) as model_resolver::ProgressFn),
        )?;

        let emotion_model = resolve_emotion_model(config, progress)?;
        Ok(Self::from_paths(face_model, emotion_model, config))
    }

    /// Uses already resolved model files.
    pub fn from_paths(face_model: PathBuf, emotion_model: PathBuf, config: &PipelineConfig) -> Self {
        Self {
            face_model,
            emotion_model,
            confidence: config.confidence,
            scorer: config.scorer,
        }
    }

    /// Builds a pipeline that reports to `logger`.
    pub fn build_with_logger(
        &self,
        logger: Box<dyn PipelineLogger>,
    ) -> Result<AnalysisPipeline, PipelineBuildError> {
        Ok(self.build()?.with_logger(logger))
    }
}

impl PipelineFactory for ModelPipelineFactory {
    fn build(&self) -> Result<AnalysisPipeline, PipelineBuildError> {
        let locator = OnnxYoloLocator::new(&self.face_model, self.confidence)
            .map_err(|e| load_error(&self.face_model, e))?;
        let scorer = create_scorer(self.scorer, &self.emotion_model)
            .map_err(|e| load_error(&self.emotion_model, e))?;
        Ok(AnalysisPipeline::new(Box::new(locator), scorer))
    }
}

fn resolve_emotion_model(
    config: &PipelineConfig,
    progress: Option<fn(u64, u64)>,
) -> Result<PathBuf, PipelineBuildError> {
    if let Some(path) = &config.emotion_model {
        return Ok(model_resolver::require_local(path)?);
    }
    if !config.scorer.is_downloadable() {
        return Err(PipelineBuildError::ModelRequired(config.scorer));
    }
    log::info!("Resolving model: {FERPLUS_MODEL_NAME}");
    Ok(model_resolver::resolve(
        FERPLUS_MODEL_NAME,
        FERPLUS_MODEL_URL,
        None,
        progress.map(|f| Box::new(f) as model_resolver::ProgressFn),
    )?)
}

fn load_error(path: &Path, e: Box<dyn std::error::Error>) -> PipelineBuildError {
    PipelineBuildError::Load {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}
