pub mod processing_pipeline;
pub mod service;
pub mod step;

pub use processing_pipeline::{AnalyzerBuilder, AnalyzerStep, ProcessingPipeline};
pub use service::AnalyzerService;
pub use step::{ClassificationAnalyzer, SegmentationAnalyzer};
