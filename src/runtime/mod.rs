//! Boundary to the external inference runtime.
//!
//! The analyzers only see [`InferenceModule`]: one input tensor in, a named
//! collection of output tensors out. [`TractModule`] is the ONNX-backed
//! implementation; [`ModuleLoader`] loads it lazily, once.

pub mod loader;
pub mod tensor;
pub mod tract_module;

#[cfg(test)]
pub(crate) mod fake;

pub use loader::ModuleLoader;
pub use tensor::{InputTensor, NamedOutputs, OutputTensor};
pub use tract_module::TractModule;

use crate::error::AppError;

pub trait InferenceModule: Send + Sync {
    fn forward(&self, input: &InputTensor) -> Result<NamedOutputs, AppError>;
}
