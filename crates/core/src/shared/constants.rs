pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const FERPLUS_MODEL_NAME: &str = "emotion-ferplus-8.onnx";
pub const FERPLUS_MODEL_URL: &str =
    "https://github.com/onnx/models/raw/main/validated/vision/body_analysis/emotion_ferplus/model/emotion-ferplus-8.onnx";

/// Upper end of the emotion intensity scale used by the learning-state rules.
pub const INTENSITY_SCALE: f64 = 100.0;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Directory name used under the platform cache/config dirs.
pub const APP_DIR_NAME: &str = "EmoLens";
