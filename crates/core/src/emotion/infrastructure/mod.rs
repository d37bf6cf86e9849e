pub mod onnx_emotion_scorer;
pub mod scorer_factory;
