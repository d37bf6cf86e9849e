pub mod emotion;
pub mod emotion_scorer;
pub mod learning_state;
