use std::path::Path;

use tract_onnx::prelude::*;
use tracing::{debug, info};

use crate::error::AppError;
use crate::pipeline::preprocessing::TensorSpec;
use crate::runtime::tensor::{InputTensor, NamedOutputs, OutputTensor};
use crate::runtime::InferenceModule;

type Plan = RunnableModel<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// ONNX model executed with tract.
pub struct TractModule {
    plan: Plan,
    output_names: Vec<String>,
}

impl TractModule {
    /// Loads a serialized model from `path` and pins its input to
    /// `f32 [1, 3, H, W]` for the given tensor spec.
    pub fn load(path: &Path, spec: &TensorSpec) -> Result<Self, AppError> {
        let load_error = |e: TractError| AppError::ModuleLoad {
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
        };

        let input_shape = tvec![1, 3, spec.height as usize, spec.width as usize];
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(load_error)?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), input_shape))
            .map_err(load_error)?
            .into_optimized()
            .map_err(load_error)?
            .into_runnable()
            .map_err(load_error)?;

        let model = plan.model();
        let output_names = model
            .output_outlets()
            .map_err(load_error)?
            .iter()
            .map(|outlet| {
                model
                    .outlet_label(*outlet)
                    .map(str::to_string)
                    .unwrap_or_else(|| model.node(outlet.node).name.clone())
            })
            .collect::<Vec<_>>();

        info!(
            "Loaded module {} with outputs {:?}",
            path.display(),
            output_names
        );
        Ok(Self { plan, output_names })
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }
}

impl InferenceModule for TractModule {
    fn forward(&self, input: &InputTensor) -> Result<NamedOutputs, AppError> {
        let inference_error = |e: TractError| AppError::Inference(format!("{e:#}"));

        let tensor = Tensor::from_shape(input.shape(), input.data()).map_err(inference_error)?;
        let results = self
            .plan
            .run(tvec![tensor.into()])
            .map_err(inference_error)?;

        let mut outputs = NamedOutputs::with_capacity(results.len());
        for (name, value) in self.output_names.iter().zip(results.iter()) {
            let data = value
                .as_slice::<f32>()
                .map_err(inference_error)?
                .to_vec();
            debug!("Output '{}' has shape {:?}", name, value.shape());
            outputs.insert(name.clone(), OutputTensor::new(value.shape().to_vec(), data));
        }
        Ok(outputs)
    }
}
