use std::sync::Arc;

use crate::analysis::analysis_pipeline::AnalysisPipeline;
use crate::analysis::pipeline_factory::PipelineFactory;
use crate::streaming::protocol::{decode_frame, FrameReply, InboundEvent, OutboundEvent};

enum PipelineState {
    NotBuilt,
    Ready(AnalysisPipeline),
    Unavailable,
}

/// Per-connection bridge from inbound events to replies.
///
/// Owns its own [`AnalysisPipeline`], built from the shared factory on the
/// first frame, so connections never share inference state. Every `frame`
/// event gets exactly one reply and `ping` gets `pong`; events are handled
/// one at a time, so replies keep event order.
pub struct StreamingResponder {
    connection_id: u64,
    factory: Arc<dyn PipelineFactory>,
    pipeline: PipelineState,
}

impl StreamingResponder {
    pub fn new(connection_id: u64, factory: Arc<dyn PipelineFactory>) -> Self {
        Self {
            connection_id,
            factory,
            pipeline: PipelineState::NotBuilt,
        }
    }

    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    /// Handles one inbound event. Blocks for the duration of an analysis.
    pub fn handle(&mut self, event: InboundEvent) -> Option<OutboundEvent> {
        match event {
            InboundEvent::Ping => {
                log::debug!("Ping from connection {}", self.connection_id);
                Some(OutboundEvent::Pong)
            }
            InboundEvent::Frame(payload) => {
                let reply = match decode_frame(&payload) {
                    Ok(frame) => match self.pipeline() {
                        Some(pipeline) => FrameReply::from_result(&pipeline.analyze(&frame)),
                        None => FrameReply::unavailable(),
                    },
                    Err(e) => {
                        log::warn!("Connection {}: invalid image payload: {e}", self.connection_id);
                        FrameReply::invalid_image()
                    }
                };
                Some(OutboundEvent::FrameReceived(reply))
            }
            InboundEvent::Other(name) => {
                log::debug!("Connection {}: ignoring event '{name}'", self.connection_id);
                None
            }
        }
    }

    /// Builds the pipeline on first use. A failed build is not retried
    /// for the lifetime of the connection.
    fn pipeline(&mut self) -> Option<&mut AnalysisPipeline> {
        if matches!(self.pipeline, PipelineState::NotBuilt) {
            self.pipeline = match self.factory.build() {
                Ok(pipeline) => PipelineState::Ready(pipeline),
                Err(e) => {
                    log::warn!("Connection {}: analysis unavailable: {e}", self.connection_id);
                    PipelineState::Unavailable
                }
            };
        }
        match &mut self.pipeline {
            PipelineState::Ready(pipeline) => Some(pipeline),
            _ => None,
        }
    }
}
