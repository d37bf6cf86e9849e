use crate::overlay::domain::shared_analysis::PublishedAnalysis;
use crate::shared::frame::Frame;

/// Presents rendered overlay frames (window, files, network, ...).
pub trait OverlaySink: Send {
    /// Receives one annotated frame and the analysis it was annotated with.
    fn present(
        &mut self,
        frame: &Frame,
        analysis: Option<&PublishedAnalysis>,
    ) -> Result<(), Box<dyn std::error::Error>>;
}

/// Discards every frame.
pub struct NullSink;

impl OverlaySink for NullSink {
    fn present(
        &mut self,
        _frame: &Frame,
        _analysis: Option<&PublishedAnalysis>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}
