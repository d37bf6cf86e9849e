//! YOLO face locator using ONNX Runtime via `ort`.
//!
//! Handles letterbox preprocessing, inference, NMS post-processing and
//! selection of the single most prominent face.
use std::path::Path;

use crate::detection::domain::face_locator::{FaceLocator, LocateError};
use crate::detection::infrastructure::execution_provider::preferred_execution_providers;
use crate::shared::face_region::FaceRegion;
use crate::shared::frame::Frame;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// YOLO face locator backed by an ONNX Runtime session.
pub struct OnnxYoloLocator {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloLocator {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    // [N, C, H, W]; square input, so H is enough
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded face model {} (input {input_size}px, confidence {confidence:.2})",
            model_path.display()
        );

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl FaceLocator for OnnxYoloLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Option<FaceRegion>, LocateError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(None);
        }

        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err(LocateError::Output("YOLO model produced no outputs".into()));
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor
            .as_slice()
            .ok_or_else(|| LocateError::Output("cannot get tensor slice".into()))?;

        let mut raw_dets = parse_detections(data, &shape, self.confidence)?;
        for det in raw_dets.iter_mut() {
            det.unletterbox(scale, pad_x, pad_y);
        }

        let kept = nms(&mut raw_dets, NMS_IOU_THRESH);
        Ok(most_prominent(&kept, frame.width(), frame.height()))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padded with 114/255 gray, YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);
    if frame.channels() == 0 {
        return (tensor, scale, pad_x, pad_y);
    }

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let channels = frame.channels() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                // grayscale sources replicate their single channel
                let sc = c.min(channels - 1);
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, sc]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDetection {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
}

impl RawDetection {
    fn unletterbox(&mut self, scale: f64, pad_x: u32, pad_y: u32) {
        self.x1 = (self.x1 - pad_x as f64) / scale;
        self.y1 = (self.y1 - pad_y as f64) / scale;
        self.x2 = (self.x2 - pad_x as f64) / scale;
        self.y2 = (self.y2 - pad_y as f64) / scale;
    }

    fn bbox(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// Decodes raw YOLO output rows `[cx, cy, w, h, conf, ...]` above `confidence`.
///
/// Output is `[1, features, detections]` (transposed) or
/// `[1, detections, features]`; both are handled.
fn parse_detections(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
) -> Result<Vec<RawDetection>, LocateError> {
    if shape.len() != 3 {
        return Err(LocateError::Output(format!(
            "unexpected YOLO output shape: {shape:?}"
        )));
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 || data.len() < num_dets * num_feats {
        return Ok(Vec::new());
    }

    let feature = |det: usize, f: usize| -> f64 {
        if transposed {
            data[f * num_dets + det] as f64
        } else {
            data[det * num_feats + f] as f64
        }
    };

    let mut dets = Vec::new();
    for i in 0..num_dets {
        let conf = feature(i, 4);
        if conf < confidence {
            continue;
        }
        let (cx, cy, w, h) = (feature(i, 0), feature(i, 1), feature(i, 2), feature(i, 3));
        dets.push(RawDetection {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
            confidence: conf,
        });
    }
    Ok(dets)
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if !suppressed[j] && bbox_iou(&dets[i].bbox(), &dets[j].bbox()) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

/// Picks the largest clamped box; higher confidence breaks area ties.
fn most_prominent(dets: &[RawDetection], frame_w: u32, frame_h: u32) -> Option<FaceRegion> {
    dets.iter()
        .filter_map(|d| {
            FaceRegion::from_corners_clamped(d.x1, d.y1, d.x2, d.y2, frame_w, frame_h)
                .map(|r| (r, d.confidence))
        })
        .max_by(|(a, conf_a), (b, conf_b)| {
            a.area().cmp(&b.area()).then(
                conf_a
                    .partial_cmp(conf_b)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        })
        .map(|(region, _)| region)
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f64, y1: f64, x2: f64, y2: f64, confidence: f64) -> RawDetection {
        RawDetection {
            x1,
            y1,
            x2,
            y2,
            confidence,
        }
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 → 640: scale 3.2, new 640x320, pad_y 160
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let (tensor, scale, pad_x, pad_y) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert!((scale - 3.2).abs() < 0.01);
        assert_eq!(pad_x, 0);
        assert_eq!(pad_y, 160);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let frame = Frame::new(vec![255u8; 100 * 50 * 3], 100, 50, 3, 0);
        let (tensor, _, pad_x, pad_y) = letterbox(&frame, 640);

        let y = pad_y as usize + 1;
        let x = pad_x as usize + 1;
        assert!((tensor[[0, 0, y, x]] - 1.0).abs() < 0.01);
        assert!((tensor[[0, 0, 0, 0]] - 114.0 / 255.0).abs() < 0.01);
    }

    #[test]
    fn test_letterbox_grayscale_replicates_channel() {
        let frame = Frame::new(vec![255u8; 64 * 64], 64, 64, 1, 0);
        let (tensor, _, _, _) = letterbox(&frame, 128);
        assert!((tensor[[0, 2, 10, 10]] - 1.0).abs() < 0.01);
    }

    // ── Output parsing ───────────────────────────────────────────────

    #[test]
    fn test_letterbox_channelless_frame_is_all_padding() {
        let frame = Frame::new(Vec::new(), 32, 32, 0, 0);
        let (tensor, _, _, _) = letterbox(&frame, 64);
        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
        assert!(tensor.iter().all(|&v| (v - 114.0 / 255.0).abs() < 1e-6));
    }

    #[test]
    fn test_parse_row_major_output() {
        // [1, 6 detections, 5 features]; rows after the first are below threshold
        let mut data = vec![0.0f32; 6 * 5];
        data[..5].copy_from_slice(&[50.0, 50.0, 20.0, 20.0, 0.9]);
        data[5..10].copy_from_slice(&[10.0, 10.0, 4.0, 4.0, 0.1]);
        let dets = parse_detections(&data, &[1, 6, 5], 0.5).unwrap();
        assert_eq!(dets.len(), 1);
        assert!((dets[0].x1 - 40.0).abs() < 1e-9);
        assert!((dets[0].y2 - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_transposed_output() {
        // [1, 5 features, 6 detections]; only detection 3 is confident
        let num_dets = 6;
        let mut data = vec![0.0f32; 5 * num_dets];
        let values = [30.0, 40.0, 10.0, 20.0, 0.8];
        for (f, v) in values.iter().enumerate() {
            data[f * num_dets + 3] = *v;
        }
        let dets = parse_detections(&data, &[1, 5, num_dets], 0.5).unwrap();
        assert_eq!(dets.len(), 1);
        assert!((dets[0].x1 - 25.0).abs() < 1e-9);
        assert!((dets[0].y1 - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_rejects_unexpected_rank() {
        assert!(parse_detections(&[0.0; 10], &[10], 0.5).is_err());
    }

    #[test]
    fn test_unletterbox_maps_back_to_frame() {
        let mut d = det(10.0, 170.0, 74.0, 234.0, 0.9);
        d.unletterbox(3.2, 0, 160);
        assert!((d.x1 - 3.125).abs() < 1e-9);
        assert!((d.y1 - 3.125).abs() < 1e-9);
        assert!((d.y2 - 23.125).abs() < 1e-9);
    }

    // ── NMS and selection ────────────────────────────────────────────

    #[test]
    fn test_nms_suppresses_overlapping() {
        let mut dets = vec![
            det(0.0, 0.0, 100.0, 100.0, 0.9),
            det(5.0, 5.0, 105.0, 105.0, 0.8),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_nms_keeps_non_overlapping() {
        let mut dets = vec![
            det(0.0, 0.0, 50.0, 50.0, 0.9),
            det(200.0, 200.0, 250.0, 250.0, 0.8),
        ];
        assert_eq!(nms(&mut dets, 0.3).len(), 2);
    }

    #[test]
    fn test_most_prominent_prefers_largest_box() {
        let dets = vec![
            det(0.0, 0.0, 20.0, 20.0, 0.99),
            det(50.0, 50.0, 110.0, 120.0, 0.6),
        ];
        let region = most_prominent(&dets, 200, 200).unwrap();
        assert_eq!(region, FaceRegion::new(50, 50, 60, 70));
    }

    #[test]
    fn test_most_prominent_clamps_to_frame() {
        let dets = vec![det(-10.0, -10.0, 40.0, 40.0, 0.9)];
        let region = most_prominent(&dets, 30, 30).unwrap();
        assert!(region.fits_within(30, 30));
        assert_eq!(region.x, 0);
    }

    #[test]
    fn test_most_prominent_empty_is_none() {
        assert!(most_prominent(&[], 100, 100).is_none());
    }

    #[test]
    fn test_most_prominent_skips_boxes_outside_frame() {
        let dets = vec![det(500.0, 500.0, 600.0, 600.0, 0.9)];
        assert!(most_prominent(&dets, 100, 100).is_none());
    }

    #[test]
    fn test_bbox_iou_perfect() {
        let b = [0.0, 0.0, 10.0, 10.0];
        assert!((bbox_iou(&b, &b) - 1.0).abs() < 1e-9);
    }
}
