use crate::common::Frame;
use crate::pipeline::context::metrics::FrameMetrics;
use crate::pipeline::context::state::{AnalyzedState, IngestedState, ProcessingState};
use crate::pipeline::domain::Analysis;
use std::sync::Arc;
use std::time::{Duration, Instant};

// FrameContext with compile-time state tracking via the state marker
pub struct FrameContext<S> {
    frame: Arc<Frame>,
    metrics: FrameMetrics,
    processing_start: Instant,
    state: S,
}

impl<S: ProcessingState> FrameContext<S> {
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Shared handle for work that outlives the borrow, e.g. blocking tasks.
    pub fn shared_frame(&self) -> Arc<Frame> {
        Arc::clone(&self.frame)
    }

    pub fn metrics(&self) -> &FrameMetrics {
        &self.metrics
    }

    pub fn elapsed(&self) -> Duration {
        self.processing_start.elapsed()
    }

    pub fn state_name(&self) -> &'static str {
        S::state_name()
    }
}

impl FrameContext<IngestedState> {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame: Arc::new(frame),
            metrics: FrameMetrics::new(),
            processing_start: Instant::now(),
            state: IngestedState,
        }
    }

    pub fn into_analyzed(mut self, analysis: Analysis) -> FrameContext<AnalyzedState> {
        self.metrics
            .record_analysis_duration(analysis.analysis_duration());
        self.metrics
            .record_module_forward_duration(analysis.module_forward_duration());
        self.metrics.record_total_duration(self.elapsed());
        FrameContext::<AnalyzedState> {
            frame: self.frame,
            metrics: self.metrics,
            processing_start: self.processing_start,
            state: AnalyzedState { analysis },
        }
    }
}

impl FrameContext<AnalyzedState> {
    pub fn analysis(&self) -> &Analysis {
        &self.state.analysis
    }

    pub fn into_parts(self) -> (Arc<Frame>, Analysis, FrameMetrics) {
        (self.frame, self.state.analysis, self.metrics)
    }
}
