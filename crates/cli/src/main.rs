use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::Ordering;
use std::time::Duration;

use clap::Parser;

use emolens_core::analysis::pipeline_factory::{ModelPipelineFactory, PipelineConfig};
use emolens_core::analysis::pipeline_logger::StdoutPipelineLogger;
use emolens_core::emotion::infrastructure::scorer_factory::ScorerBackend;
use emolens_core::overlay::domain::overlay_sink::{NullSink, OverlaySink};
use emolens_core::overlay::infrastructure::image_file_sink::ImageFileSink;
use emolens_core::overlay::overlay_loop::{ConcurrentOverlayLoop, OverlayConfig};
use emolens_core::shared::constants::IMAGE_EXTENSIONS;
use emolens_core::shared::settings::Settings;
use emolens_core::video::domain::frame_source::FrameSource;
use emolens_core::video::infrastructure::ffmpeg_frame_source::FfmpegFrameSource;
use emolens_core::video::infrastructure::still_image_source::StillImageSource;

/// Live face emotion overlay for cameras, video files and streams.
#[derive(Parser)]
#[command(name = "emolens-overlay")]
struct Cli {
    /// Video file, stream URL, capture device or still image.
    #[arg(long)]
    source: String,

    /// Capture demuxer for device sources (e.g. v4l2, avfoundation, dshow).
    #[arg(long)]
    input_format: Option<String>,

    /// Write annotated frames to this directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Save every Nth annotated frame (0 = only keep latest.png).
    #[arg(long, default_value = "0")]
    save_every: usize,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Emotion scorer backend: ferplus or fer2013.
    #[arg(long)]
    scorer: Option<ScorerBackend>,

    /// Emotion model file (required for fer2013).
    #[arg(long)]
    emotion_model: Option<PathBuf>,

    /// Stop after this many rendered frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Delay before retrying a failed frame read, in milliseconds.
    #[arg(long)]
    retry_delay_ms: Option<u64>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let settings = Settings::load();
    let config = pipeline_config(&cli, &settings);

    let factory = ModelPipelineFactory::resolve(&config, Some(download_progress))?;
    eprintln!();
    let pipeline = factory.build_with_logger(Box::new(StdoutPipelineLogger::default()))?;

    let source = open_source(&cli.source, cli.input_format.as_deref())?;
    let mut sink = open_sink(cli.output_dir.as_deref(), cli.save_every)?;

    let overlay_config = OverlayConfig {
        max_frames: cli.max_frames,
        retry_delay: Duration::from_millis(cli.retry_delay_ms.unwrap_or(settings.retry_delay_ms)),
        ..OverlayConfig::default()
    };
    let stop = overlay_config.stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("Stopping after the current frame");
        stop.store(true, Ordering::SeqCst);
    }) {
        log::warn!("Failed to install Ctrl+C handler: {e}");
    }

    let stats = ConcurrentOverlayLoop::new(overlay_config).run(source, pipeline, sink.as_mut())?;
    log::info!(
        "Rendered {} frames ({} skipped), {} analyses published, {} failed",
        stats.frames_rendered,
        stats.frames_skipped,
        stats.analyses_published,
        stats.analyses_failed
    );
    if let Some(dir) = &cli.output_dir {
        log::info!("Output written to {}", dir.display());
    }
    Ok(())
}

fn pipeline_config(cli: &Cli, settings: &Settings) -> PipelineConfig {
    let mut config = PipelineConfig::from_settings(settings);
    if let Some(confidence) = cli.confidence {
        config.confidence = confidence;
    }
    if let Some(scorer) = cli.scorer {
        config.scorer = scorer;
    }
    if let Some(path) = &cli.emotion_model {
        config.emotion_model = Some(path.clone());
    }
    config
}

fn open_source(
    source: &str,
    input_format: Option<&str>,
) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    if input_format.is_none() && is_image(Path::new(source)) {
        Ok(Box::new(StillImageSource::open(Path::new(source))?))
    } else {
        Ok(Box::new(FfmpegFrameSource::open(source, input_format)?))
    }
}

fn open_sink(
    output_dir: Option<&Path>,
    save_every: usize,
) -> Result<Box<dyn OverlaySink>, Box<dyn std::error::Error>> {
    match output_dir {
        Some(dir) => Ok(Box::new(ImageFileSink::new(dir, save_every, true)?)),
        None => Ok(Box::new(NullSink)),
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(confidence) = cli.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(
                format!("Confidence must be between 0.0 and 1.0, got {confidence}").into(),
            );
        }
    }
    if cli.save_every > 0 && cli.output_dir.is_none() {
        return Err("--save-every requires --output-dir".into());
    }
    if cli.max_frames == Some(0) {
        return Err("--max-frames must be at least 1".into());
    }
    if let Some(path) = &cli.emotion_model {
        if !path.exists() {
            return Err(format!("Emotion model not found: {}", path.display()).into());
        }
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}
