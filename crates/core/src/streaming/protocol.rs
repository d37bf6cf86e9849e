//! JSON wire format of the streaming endpoint.
//!
//! Text messages are envelopes `{"event": "<name>", "data": <payload>}`;
//! binary messages carry an encoded image and count as a `frame` event.
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::analysis::analysis_result::AnalysisResult;
use crate::emotion::domain::emotion::EmotionScores;
use crate::emotion::domain::learning_state::LearningState;
use crate::shared::face_region::FaceRegion;
use crate::shared::frame::Frame;

pub const INVALID_IMAGE_ERROR: &str = "Invalid image data";
pub const ANALYSIS_FAILED_ERROR: &str = "Emotion analysis failed";
pub const ANALYSIS_UNAVAILABLE_ERROR: &str = "Analysis unavailable";

#[derive(Error, Debug)]
pub enum FrameDecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("undecodable image: {0}")]
    Image(#[from] image::ImageError),
    #[error("empty frame payload")]
    EmptyPayload,
    #[error("malformed message: {0}")]
    Envelope(String),
}

/// Image carried by a `frame` event, still encoded.
#[derive(Clone, Debug, PartialEq)]
pub enum FramePayload {
    /// Base64 text, optionally as a `data:image/...;base64,` URL.
    Text(String),
    /// Raw encoded image bytes (JPEG, PNG, ...).
    Binary(Vec<u8>),
    /// `data` had a shape no image can be read from.
    Unsupported,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InboundEvent {
    Frame(FramePayload),
    Ping,
    Other(String),
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl InboundEvent {
    /// Parses a text message envelope.
    pub fn from_text(text: &str) -> Result<Self, FrameDecodeError> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| FrameDecodeError::Envelope(e.to_string()))?;
        Ok(match envelope.event.as_str() {
            "frame" => InboundEvent::Frame(frame_payload(envelope.data)),
            "ping" => InboundEvent::Ping,
            _ => InboundEvent::Other(envelope.event),
        })
    }

    pub fn from_binary(bytes: Vec<u8>) -> Self {
        InboundEvent::Frame(FramePayload::Binary(bytes))
    }
}

fn frame_payload(data: serde_json::Value) -> FramePayload {
    match data {
        serde_json::Value::String(s) => FramePayload::Text(s),
        serde_json::Value::Object(mut map) => match map.remove("image") {
            Some(serde_json::Value::String(s)) => FramePayload::Text(s),
            _ => FramePayload::Unsupported,
        },
        _ => FramePayload::Unsupported,
    }
}

/// Decodes a frame payload into an RGB frame.
pub fn decode_frame(payload: &FramePayload) -> Result<Frame, FrameDecodeError> {
    let bytes = match payload {
        FramePayload::Text(text) => STANDARD.decode(strip_data_url(text).trim())?,
        FramePayload::Binary(bytes) => bytes.clone(),
        FramePayload::Unsupported => {
            return Err(FrameDecodeError::Envelope(
                "frame data must be a string or an object with an image field".into(),
            ))
        }
    };
    if bytes.is_empty() {
        return Err(FrameDecodeError::EmptyPayload);
    }
    let image = image::load_from_memory(&bytes)?.to_rgb8();
    Ok(Frame::from_rgb_image(image, 0))
}

fn strip_data_url(text: &str) -> &str {
    if text.starts_with("data:") {
        text.split_once(',').map_or("", |(_, data)| data)
    } else {
        text
    }
}

/// Reply to one `frame` event.
///
/// `hasDetectedFace` is the string `"true"` or `"false"`. Optional fields
/// are omitted rather than sent as `null`. A scorer failure keeps
/// `hasDetectedFace: "true"` and the region, so clients can tell it apart
/// from "no face".
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameReply {
    #[serde(rename = "hasDetectedFace", serialize_with = "bool_as_string")]
    pub has_detected_face: bool,
    #[serde(rename = "faceRegion", skip_serializing_if = "Option::is_none")]
    pub face_region: Option<FaceRegion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotions: Option<EmotionScores>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_state: Option<LearningState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FrameReply {
    pub fn from_result(result: &AnalysisResult) -> Self {
        Self {
            has_detected_face: result.face_detected(),
            face_region: result.face_region(),
            emotions: result.scores().cloned(),
            emotion: result.dominant_label().map(|e| e.as_str().to_string()),
            learning_state: result.learning_state(),
            error: result
                .is_transient_failure()
                .then(|| ANALYSIS_FAILED_ERROR.to_string()),
        }
    }

    pub fn invalid_image() -> Self {
        Self::error(INVALID_IMAGE_ERROR)
    }

    pub fn unavailable() -> Self {
        Self::error(ANALYSIS_UNAVAILABLE_ERROR)
    }

    fn error(message: &str) -> Self {
        Self {
            has_detected_face: false,
            face_region: None,
            emotions: None,
            emotion: None,
            learning_state: None,
            error: Some(message.to_string()),
        }
    }
}

fn bool_as_string<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "true" } else { "false" })
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    FrameReceived(FrameReply),
    Pong,
}

impl OutboundEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
