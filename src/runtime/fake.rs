use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::AppError;
use crate::runtime::tensor::{InputTensor, NamedOutputs, OutputTensor};
use crate::runtime::InferenceModule;

/// Module returning canned outputs, counting how often it ran.
pub(crate) struct FakeModule {
    outputs: NamedOutputs,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl FakeModule {
    pub(crate) fn new(outputs: NamedOutputs) -> Self {
        Self {
            outputs,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn constant(name: &str, shape: Vec<usize>, data: Vec<f32>) -> Self {
        let mut outputs = NamedOutputs::new();
        outputs.insert(name.to_string(), OutputTensor::new(shape, data));
        Self::new(outputs)
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(NamedOutputs::new())
        }
    }

    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub(crate) fn into_handle(self) -> Arc<dyn InferenceModule> {
        Arc::new(self)
    }
}

impl InferenceModule for FakeModule {
    fn forward(&self, _input: &InputTensor) -> Result<NamedOutputs, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Inference("fake module failure".to_string()));
        }
        Ok(self.outputs.clone())
    }
}

/// Segmentation scores where `class` wins every pixel.
pub(crate) fn uniform_segmentation(classes: usize, height: usize, width: usize, class: usize) -> FakeModule {
    let plane = height * width;
    let mut data = vec![0.0; classes * plane];
    data[class * plane..(class + 1) * plane].fill(1.0);
    FakeModule::constant("out", vec![1, classes, height, width], data)
}
