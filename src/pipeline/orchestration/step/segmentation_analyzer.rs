use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;

use super::{convert_and_forward, run_blocking, shared_buffer};
use crate::error::AppError;
use crate::pipeline::context::{FrameContext, IngestedState};
use crate::pipeline::domain::overlay::NUM_CLASSES;
use crate::pipeline::domain::{argmax_overlay, Analysis, AnalysisOutput, OverlayPalette, ScoreGrid};
use crate::pipeline::orchestration::processing_pipeline::AnalyzerStep;
use crate::pipeline::preprocessing::{TensorBuffer, TensorSpec};
use crate::runtime::tensor::{select_output, OutputTensor};
use crate::runtime::ModuleLoader;

pub const DEFAULT_SEGMENTATION_OUTPUT: &str = "out";

struct SegmentationSettings {
    spec: TensorSpec,
    output_name: String,
    classes: usize,
    palette: OverlayPalette,
}

/// Per-pixel class overlay from a segmentation module.
pub struct SegmentationAnalyzer {
    loader: Arc<ModuleLoader>,
    buffer: Arc<Mutex<TensorBuffer>>,
    settings: Arc<SegmentationSettings>,
}

impl SegmentationAnalyzer {
    pub fn new(loader: Arc<ModuleLoader>, spec: TensorSpec) -> Self {
        Self {
            loader,
            buffer: shared_buffer(TensorBuffer::new(spec)),
            settings: Arc::new(SegmentationSettings {
                spec,
                output_name: DEFAULT_SEGMENTATION_OUTPUT.to_string(),
                classes: NUM_CLASSES,
                palette: OverlayPalette::default(),
            }),
        }
    }

    pub fn with_output_name(self, output_name: impl Into<String>) -> Self {
        self.update_settings(|s| s.output_name = output_name.into())
    }

    pub fn with_classes(self, classes: usize) -> Self {
        self.update_settings(|s| s.classes = classes)
    }

    pub fn with_palette(self, palette: OverlayPalette) -> Self {
        self.update_settings(|s| s.palette = palette)
    }

    fn update_settings(mut self, update: impl FnOnce(&mut SegmentationSettings)) -> Self {
        if let Some(settings) = Arc::get_mut(&mut self.settings) {
            update(settings);
        }
        self
    }
}

/// Score plane size: the trailing two dimensions of the output, or the
/// input size when the module returns a flat tensor.
fn plane_dims(output: &OutputTensor, spec: &TensorSpec) -> (usize, usize) {
    match output.shape.as_slice() {
        [.., h, w] if output.shape.len() >= 3 => (*h, *w),
        _ => (spec.height as usize, spec.width as usize),
    }
}

#[async_trait]
impl AnalyzerStep for SegmentationAnalyzer {
    async fn analyze(&self, ctx: &FrameContext<IngestedState>) -> Result<Analysis, AppError> {
        let module = self.loader.get().await?;
        let frame = ctx.shared_frame();
        let buffer = Arc::clone(&self.buffer);
        let settings = Arc::clone(&self.settings);

        run_blocking(move || {
            let start = Instant::now();
            let pass = convert_and_forward(module.as_ref(), &buffer, &frame)?;

            let output = select_output(&pass.outputs, Some(settings.output_name.as_str()))?;
            let (height, width) = plane_dims(output, &settings.spec);
            let grid = ScoreGrid::new(&output.data, settings.classes, height, width)?;
            let mask = argmax_overlay(&grid, &settings.palette);

            Ok(Analysis::new(
                AnalysisOutput::Segmentation(mask),
                pass.forward_duration,
                start.elapsed(),
            ))
        })
        .await
    }

    fn name(&self) -> &'static str {
        "segmentation"
    }
}
