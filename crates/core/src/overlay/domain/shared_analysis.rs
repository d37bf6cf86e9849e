use std::sync::{Arc, Mutex, PoisonError};

use crate::analysis::analysis_result::AnalysisResult;

/// An analysis result stamped with its publication order.
#[derive(Clone, Debug, PartialEq)]
pub struct PublishedAnalysis {
    pub sequence: u64,
    pub result: AnalysisResult,
}

struct Slot {
    latest: Mutex<Option<Arc<PublishedAnalysis>>>,
}

/// Creates the single hand-off point between the analysis worker and the
/// display loop.
///
/// The publisher is the only writer and the reader the only observer. The
/// lock is held just long enough to swap or clone an `Arc`, never during
/// analysis, and readers always get a complete, immutable snapshot.
pub fn analysis_slot() -> (AnalysisPublisher, AnalysisReader) {
    let slot = Arc::new(Slot {
        latest: Mutex::new(None),
    });
    (
        AnalysisPublisher {
            slot: Arc::clone(&slot),
            next_sequence: 1,
        },
        AnalysisReader { slot },
    )
}

/// Write half of the slot. Not `Clone`: exactly one publisher exists.
pub struct AnalysisPublisher {
    slot: Arc<Slot>,
    next_sequence: u64,
}

impl AnalysisPublisher {
    /// Replaces the current state wholesale and returns its sequence number.
    /// Sequence numbers start at 1 and strictly increase.
    pub fn publish(&mut self, result: AnalysisResult) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let published = Arc::new(PublishedAnalysis { sequence, result });
        let mut latest = self
            .slot
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *latest = Some(published);
        sequence
    }
}

/// Read half of the slot.
#[derive(Clone)]
pub struct AnalysisReader {
    slot: Arc<Slot>,
}

impl AnalysisReader {
    /// The most recently published analysis, if any.
    pub fn latest(&self) -> Option<Arc<PublishedAnalysis>> {
        self.slot
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
