use serde::Serialize;
use std::time::Duration;

use crate::pipeline::domain::overlay::SegmentationMask;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub class_index: usize,
    pub label: String,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub enum AnalysisOutput {
    Segmentation(SegmentationMask),
    Classification(Vec<Prediction>),
}

/// Result of analyzing one frame.
#[derive(Debug, Clone)]
pub struct Analysis {
    output: AnalysisOutput,
    module_forward_duration: Duration,
    analysis_duration: Duration,
}

impl Analysis {
    pub fn new(
        output: AnalysisOutput,
        module_forward_duration: Duration,
        analysis_duration: Duration,
    ) -> Self {
        Self {
            output,
            module_forward_duration,
            analysis_duration,
        }
    }

    pub fn output(&self) -> &AnalysisOutput {
        &self.output
    }

    pub fn mask(&self) -> Option<&SegmentationMask> {
        match &self.output {
            AnalysisOutput::Segmentation(mask) => Some(mask),
            AnalysisOutput::Classification(_) => None,
        }
    }

    pub fn predictions(&self) -> &[Prediction] {
        match &self.output {
            AnalysisOutput::Classification(predictions) => predictions,
            AnalysisOutput::Segmentation(_) => &[],
        }
    }

    /// Time spent inside the module's forward call.
    pub fn module_forward_duration(&self) -> Duration {
        self.module_forward_duration
    }

    /// Conversion, forward and post-processing together.
    pub fn analysis_duration(&self) -> Duration {
        self.analysis_duration
    }
}
