use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::TrySendError;
use thiserror::Error;

use crate::analysis::analysis_pipeline::AnalysisPipeline;
use crate::overlay::domain::overlay_sink::OverlaySink;
use crate::overlay::domain::shared_analysis::{analysis_slot, AnalysisPublisher};
use crate::overlay::infrastructure::annotation::annotate;
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::{FrameSource, SourceGuard};

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(10);

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("video source is not available")]
    SourceUnavailable,
    #[error("overlay output failed: {0}")]
    Sink(String),
    #[error("analysis worker panicked")]
    WorkerPanicked,
    #[error("analysis worker stopped accepting frames")]
    WorkerDisconnected,
}

pub struct OverlayConfig {
    /// Stop after rendering this many frames.
    pub max_frames: Option<usize>,
    /// Pause after a failed frame read before trying again.
    pub retry_delay: Duration,
    /// Raised externally (e.g. Ctrl+C) to end the loop between ticks.
    pub stop: Arc<AtomicBool>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            max_frames: None,
            retry_delay: DEFAULT_RETRY_DELAY,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OverlayStats {
    pub frames_rendered: usize,
    /// Ticks where the source had no frame.
    pub frames_skipped: usize,
    pub analyses_started: usize,
    pub analyses_published: usize,
    /// Scorer failures; these never replace the displayed state.
    pub analyses_failed: usize,
}

#[derive(Default)]
struct WorkerCounts {
    published: usize,
    failed: usize,
}

/// Live display loop with analysis running beside it.
///
/// Layout: `source → capture/render (caller thread) ⇄ analysis worker`
///
/// The capture thread renders every frame with whatever analysis was
/// published last, then offers the frame to the worker over a rendezvous
/// channel. The offer only succeeds while the worker is idle and waiting,
/// so at most one analysis is ever in flight and capture never waits for
/// inference. The worker publishes into a single-slot handle that the
/// capture thread reads under a short lock.
pub struct ConcurrentOverlayLoop {
    config: OverlayConfig,
}

impl ConcurrentOverlayLoop {
    pub fn new(config: OverlayConfig) -> Self {
        Self { config }
    }

    /// Runs until stopped, `max_frames` is reached or the source ends.
    ///
    /// A source that is unavailable at startup is fatal; read failures
    /// afterwards are retried every tick. The source is released on every
    /// exit path, and an analysis in progress is allowed to finish.
    pub fn run<S: FrameSource>(
        &self,
        source: S,
        pipeline: AnalysisPipeline,
        sink: &mut dyn OverlaySink,
    ) -> Result<OverlayStats, OverlayError> {
        let mut source = SourceGuard::new(source);
        if !source.is_available() {
            return Err(OverlayError::SourceUnavailable);
        }

        let (publisher, reader) = analysis_slot();
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Frame>(0);
        let worker = spawn_analysis_worker(pipeline, publisher, frame_rx);

        let mut stats = OverlayStats::default();
        let mut failure: Option<OverlayError> = None;

        while !self.should_stop(&stats) {
            if !source.is_available() {
                log::info!("Video source ended");
                break;
            }

            let Some(frame) = source.read_frame() else {
                stats.frames_skipped += 1;
                log::debug!("No frame available, retrying");
                thread::sleep(self.config.retry_delay);
                continue;
            };

            let latest = reader.latest();
            let annotated = annotate(&frame, latest.as_ref().map(|p| &p.result));
            if let Err(e) = sink.present(&annotated, latest.as_deref()) {
                failure = Some(OverlayError::Sink(e.to_string()));
                break;
            }
            stats.frames_rendered += 1;

            match frame_tx.try_send(frame) {
                Ok(()) => stats.analyses_started += 1,
                Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Disconnected(_)) => {
                    failure = Some(OverlayError::WorkerDisconnected);
                    break;
                }
            }
        }

        drop(frame_tx);
        let joined = worker.join();
        drop(source);

        let (pipeline, counts) = joined.map_err(|_| OverlayError::WorkerPanicked)?;
        stats.analyses_published = counts.published;
        stats.analyses_failed = counts.failed;
        pipeline.log_summary();

        match failure {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }

    fn should_stop(&self, stats: &OverlayStats) -> bool {
        self.config.stop.load(Ordering::Relaxed)
            || self
                .config
                .max_frames
                .is_some_and(|max| stats.frames_rendered >= max)
    }
}

fn spawn_analysis_worker(
    mut pipeline: AnalysisPipeline,
    mut publisher: AnalysisPublisher,
    frame_rx: crossbeam_channel::Receiver<Frame>,
) -> thread::JoinHandle<(AnalysisPipeline, WorkerCounts)> {
    thread::spawn(move || {
        let mut counts = WorkerCounts::default();
        for frame in frame_rx {
            let result = pipeline.analyze(&frame);
            if result.is_transient_failure() {
                counts.failed += 1;
                continue;
            }
            let sequence = publisher.publish(result);
            counts.published += 1;
            log::debug!("Published analysis #{sequence} for frame {}", frame.index());
        }
        (pipeline, counts)
    })
}
