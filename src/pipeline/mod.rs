pub mod context;
pub mod domain;
pub mod orchestration;
pub mod pipeline_factory;
pub mod preprocessing;

pub use context::{AnalyzedState, FrameContext, FrameMetrics, IngestedState};
pub use domain::{Analysis, AnalysisOutput, Prediction, SegmentationMask};
pub use orchestration::{AnalyzerStep, ClassificationAnalyzer, ProcessingPipeline, SegmentationAnalyzer};
pub use pipeline_factory::{ConfiguredPipelineFactory, PipelineFactory};
pub use preprocessing::{TensorBuffer, TensorSpec};
