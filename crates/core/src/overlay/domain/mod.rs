pub mod overlay_sink;
pub mod shared_analysis;
