use std::time::Duration;

/// Timings collected while a frame moves through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct FrameMetrics {
    analysis_duration: Option<Duration>,
    module_forward_duration: Option<Duration>,
    total_duration: Option<Duration>,
}

impl FrameMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_analysis_duration(&mut self, duration: Duration) {
        self.analysis_duration = Some(duration);
    }

    pub fn record_module_forward_duration(&mut self, duration: Duration) {
        self.module_forward_duration = Some(duration);
    }

    /// Wall time from ingestion, including module loading and queueing.
    pub fn record_total_duration(&mut self, duration: Duration) {
        self.total_duration = Some(duration);
    }

    pub fn analysis_duration(&self) -> Option<Duration> {
        self.analysis_duration
    }

    pub fn module_forward_duration(&self) -> Option<Duration> {
        self.module_forward_duration
    }

    pub fn total_duration(&self) -> Option<Duration> {
        self.total_duration
    }
}
