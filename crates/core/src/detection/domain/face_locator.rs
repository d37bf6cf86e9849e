use thiserror::Error;

use crate::shared::face_region::FaceRegion;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("face detection inference failed: {0}")]
    Inference(String),
    #[error("unexpected detector output: {0}")]
    Output(String),
}

impl From<ort::Error> for LocateError {
    fn from(e: ort::Error) -> Self {
        LocateError::Inference(e.to_string())
    }
}

/// Domain interface for single-face localisation.
///
/// A frame without a face is `Ok(None)`, never an error. When several
/// faces are visible the implementation returns the most prominent one.
pub trait FaceLocator: Send {
    fn locate(&mut self, frame: &Frame) -> Result<Option<FaceRegion>, LocateError>;
}
