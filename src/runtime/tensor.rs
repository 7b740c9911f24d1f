use indexmap::IndexMap;

use crate::error::AppError;

/// Float tensor handed to a module, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl InputTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, AppError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(AppError::Preprocessing(format!(
                "tensor shape {shape:?} needs {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Zero-filled `[1, channels, height, width]` image tensor.
    pub fn image(channels: usize, height: usize, width: usize) -> Self {
        Self {
            shape: vec![1, channels, height, width],
            data: vec![0.0; channels * height * width],
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

/// Output tensor read back from a module as a flat row-major float array.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl OutputTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }
}

/// Outputs keyed by name, in the order the module declares them.
pub type NamedOutputs = IndexMap<String, OutputTensor>;

/// Picks `name` when given, the first declared output otherwise.
pub fn select_output<'a>(
    outputs: &'a NamedOutputs,
    name: Option<&str>,
) -> Result<&'a OutputTensor, AppError> {
    match name {
        Some(name) => outputs.get(name).ok_or_else(|| {
            AppError::Inference(format!(
                "module has no output named '{name}' (available: {:?})",
                outputs.keys().collect::<Vec<_>>()
            ))
        }),
        None => outputs
            .first()
            .map(|(_, tensor)| tensor)
            .ok_or_else(|| AppError::Inference("module returned no outputs".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_tensor_checks_shape() {
        assert!(InputTensor::new(vec![1, 3, 2, 2], vec![0.0; 12]).is_ok());
        assert!(InputTensor::new(vec![1, 3, 2, 2], vec![0.0; 11]).is_err());
        let image = InputTensor::image(3, 4, 5);
        assert_eq!(image.shape(), &[1, 3, 4, 5]);
        assert_eq!(image.data().len(), 60);
    }

    #[test]
    fn output_selection_by_name_and_order() {
        let mut outputs = NamedOutputs::new();
        outputs.insert("aux".to_string(), OutputTensor::new(vec![1], vec![1.0]));
        outputs.insert("out".to_string(), OutputTensor::new(vec![1], vec![2.0]));

        assert_eq!(select_output(&outputs, Some("out")).unwrap().data, vec![2.0]);
        assert_eq!(select_output(&outputs, None).unwrap().data, vec![1.0]);
        assert!(select_output(&outputs, Some("logits")).is_err());
        assert!(select_output(&NamedOutputs::new(), None).is_err());
    }
}
