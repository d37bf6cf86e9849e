pub mod protocol;
pub mod streaming_responder;
