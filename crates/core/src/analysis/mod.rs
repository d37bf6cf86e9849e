pub mod analysis_pipeline;
pub mod analysis_result;
pub mod pipeline_factory;
pub mod pipeline_logger;
