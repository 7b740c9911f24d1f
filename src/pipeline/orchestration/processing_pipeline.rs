use crate::common::Frame;
use crate::error::AppError;
use crate::pipeline::context::{AnalyzedState, FrameContext, IngestedState};
use crate::pipeline::domain::Analysis;
use crate::pipeline::orchestration::service::AnalyzerService;
use async_trait::async_trait;
use std::time::Duration;
use tower::timeout::TimeoutLayer;
use tower::util::BoxService;
use tower::{BoxError, Service, ServiceBuilder, ServiceExt};

/// One analysis strategy (segmentation, classification) applied to a frame.
#[async_trait]
pub trait AnalyzerStep: Send + Sync {
    async fn analyze(&self, ctx: &FrameContext<IngestedState>) -> Result<Analysis, AppError>;
    fn name(&self) -> &'static str;
}

type AnalyzerStack = BoxService<FrameContext<IngestedState>, FrameContext<AnalyzedState>, BoxError>;

pub struct AnalyzerBuilder {
    analyzer_timeout: Option<Duration>,
    analyzer: Box<dyn AnalyzerStep>,
}

impl AnalyzerBuilder {
    pub fn analyzer_timeout(mut self, analyzer_timeout: Duration) -> Self {
        self.analyzer_timeout = Some(analyzer_timeout);
        self
    }

    pub fn maybe_analyzer_timeout(mut self, analyzer_timeout: Option<Duration>) -> Self {
        self.analyzer_timeout = analyzer_timeout;
        self
    }

    pub fn build(self) -> ProcessingPipeline {
        let analyzer_name = self.analyzer.name();
        let analyzer_stack = ServiceBuilder::new()
            .option_layer(self.analyzer_timeout.map(TimeoutLayer::new))
            .service(AnalyzerService::new(self.analyzer));

        ProcessingPipeline {
            analyzer_name,
            analyzer_step: BoxService::new(analyzer_stack),
            error_state: false,
        }
    }
}

/// Runs frames through the analyzer. The first failure latches an error
/// state; from then on every frame is rejected with [`AppError::Halted`].
pub struct ProcessingPipeline {
    analyzer_name: &'static str,
    analyzer_step: AnalyzerStack,
    error_state: bool,
}

impl ProcessingPipeline {
    pub fn builder(analyzer: Box<dyn AnalyzerStep>) -> AnalyzerBuilder {
        AnalyzerBuilder {
            analyzer_timeout: None,
            analyzer,
        }
    }

    pub fn analyzer_name(&self) -> &'static str {
        self.analyzer_name
    }

    pub fn is_halted(&self) -> bool {
        self.error_state
    }

    pub async fn process(&mut self, frame: Frame) -> Result<FrameContext<AnalyzedState>, AppError> {
        if self.error_state {
            return Err(AppError::Halted);
        }

        tracing::debug!(
            "Analyzing frame {} with {}",
            frame.sequence(),
            self.analyzer_name
        );
        let result = match self.analyzer_step.ready().await {
            Ok(service) => service.call(FrameContext::new(frame)).await,
            Err(e) => Err(e),
        }
        .map_err(AppError::from_boxed);

        if let Err(e) = &result {
            tracing::error!("Error during image analysis: {}", e);
            self.error_state = true;
        }
        result
    }
}
