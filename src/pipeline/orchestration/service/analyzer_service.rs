use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::pipeline::context::{AnalyzedState, FrameContext, IngestedState};
use crate::pipeline::orchestration::processing_pipeline::AnalyzerStep;
use tower::Service;

#[derive(Clone)]
pub struct AnalyzerService {
    inner: Arc<dyn AnalyzerStep>,
}

impl AnalyzerService {
    pub fn new(inner: Box<dyn AnalyzerStep>) -> Self {
        Self {
            inner: Arc::from(inner),
        }
    }
}

impl Service<FrameContext<IngestedState>> for AnalyzerService {
    type Response = FrameContext<AnalyzedState>;
    type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: FrameContext<IngestedState>) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move {
            let analysis = inner.analyze(&req).await?;
            Ok(req.into_analyzed(analysis))
        })
    }
}
