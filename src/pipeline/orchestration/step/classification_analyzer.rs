use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;

use super::{convert_and_forward, run_blocking, shared_buffer};
use crate::error::AppError;
use crate::pipeline::context::{FrameContext, IngestedState};
use crate::pipeline::domain::{top_k, Analysis, AnalysisOutput, Labels, Prediction};
use crate::pipeline::orchestration::processing_pipeline::AnalyzerStep;
use crate::pipeline::preprocessing::{TensorBuffer, TensorSpec};
use crate::runtime::tensor::select_output;
use crate::runtime::ModuleLoader;

pub const DEFAULT_TOP_K: usize = 3;

struct ClassificationSettings {
    output_name: Option<String>,
    top_k: usize,
    labels: Labels,
}

/// Top-K class predictions from an image classification module.
pub struct ClassificationAnalyzer {
    loader: Arc<ModuleLoader>,
    buffer: Arc<Mutex<TensorBuffer>>,
    settings: Arc<ClassificationSettings>,
}

impl ClassificationAnalyzer {
    pub fn new(loader: Arc<ModuleLoader>, spec: TensorSpec, labels: Labels) -> Self {
        Self {
            loader,
            buffer: shared_buffer(TensorBuffer::new(spec)),
            settings: Arc::new(ClassificationSettings {
                output_name: None,
                top_k: DEFAULT_TOP_K,
                labels,
            }),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        if let Some(settings) = Arc::get_mut(&mut self.settings) {
            settings.top_k = top_k;
        }
        self
    }

    pub fn with_output_name(mut self, output_name: impl Into<String>) -> Self {
        if let Some(settings) = Arc::get_mut(&mut self.settings) {
            settings.output_name = Some(output_name.into());
        }
        self
    }
}

#[async_trait]
impl AnalyzerStep for ClassificationAnalyzer {
    async fn analyze(&self, ctx: &FrameContext<IngestedState>) -> Result<Analysis, AppError> {
        let module = self.loader.get().await?;
        let frame = ctx.shared_frame();
        let buffer = Arc::clone(&self.buffer);
        let settings = Arc::clone(&self.settings);

        run_blocking(move || {
            let start = Instant::now();
            let pass = convert_and_forward(module.as_ref(), &buffer, &frame)?;

            let output = select_output(&pass.outputs, settings.output_name.as_deref())?;
            let scores = &output.data;
            let predictions = top_k(scores, settings.top_k)
                .into_iter()
                .map(|class_index| Prediction {
                    class_index,
                    label: settings.labels.name(class_index),
                    score: scores[class_index],
                })
                .collect();

            Ok(Analysis::new(
                AnalysisOutput::Classification(predictions),
                pass.forward_duration,
                start.elapsed(),
            ))
        })
        .await
    }

    fn name(&self) -> &'static str {
        "classification"
    }
}
