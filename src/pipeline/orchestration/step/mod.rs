mod classification_analyzer;
mod segmentation_analyzer;

pub use classification_analyzer::ClassificationAnalyzer;
pub use segmentation_analyzer::SegmentationAnalyzer;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::common::Frame;
use crate::error::AppError;
use crate::pipeline::preprocessing::TensorBuffer;
use crate::runtime::{InferenceModule, NamedOutputs};

struct ForwardPass {
    outputs: NamedOutputs,
    forward_duration: Duration,
}

/// Fills the shared input buffer from `frame` and runs the module on it.
fn convert_and_forward(
    module: &dyn InferenceModule,
    buffer: &Mutex<TensorBuffer>,
    frame: &Frame,
) -> Result<ForwardPass, AppError> {
    let mut buffer = buffer
        .lock()
        .map_err(|_| AppError::Pipeline("tensor buffer lock poisoned".to_string()))?;
    let input = buffer.fill(frame.pixels(), frame.rotation())?;

    let forward_start = Instant::now();
    let outputs = module.forward(input)?;
    Ok(ForwardPass {
        outputs,
        forward_duration: forward_start.elapsed(),
    })
}

/// Runs CPU-bound analysis work off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Pipeline(format!("analysis worker failed: {e}")))?
}

fn shared_buffer(buffer: TensorBuffer) -> Arc<Mutex<TensorBuffer>> {
    Arc::new(Mutex::new(buffer))
}
