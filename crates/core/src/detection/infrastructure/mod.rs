pub mod execution_provider;
pub mod onnx_yolo_locator;
