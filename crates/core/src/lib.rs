//! Real-time face emotion analysis.
//!
//! Frames come from a [`video`] source, a face is located and scored by the
//! [`analysis`] pipeline, and results are either drawn over a live feed by
//! the [`overlay`] loop or returned to remote clients through [`streaming`].
pub mod analysis;
pub mod detection;
pub mod emotion;
pub mod overlay;
pub mod shared;
pub mod streaming;
pub mod video;
