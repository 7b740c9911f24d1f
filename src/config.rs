use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;
use crate::intake::{Backpressure, RawYuvDimensions};
use crate::pipeline::domain::overlay::{MAX_CLASSES, NUM_CLASSES};
use crate::pipeline::TensorSpec;

const ENV_PREFIX: &str = "SEGCAM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    #[default]
    Segment,
    Classify,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub model_dir: PathBuf,
    /// Catalog key or model path; the mode's default model when unset.
    pub model: Option<String>,
    pub mode: AnalysisMode,
    pub tensor: TensorSpec,
    pub num_classes: usize,
    pub top_k: usize,
    pub labels_path: Option<PathBuf>,
    pub output_name: Option<String>,
    pub moving_avg_period: usize,
    pub frame_buffer_size: usize,
    pub event_buffer_size: usize,
    pub frame_interval_ms: u64,
    pub backpressure: Backpressure,
    pub analyzer_timeout_ms: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub rotation_degrees: u32,
    pub raw_yuv: Option<RawYuvDimensions>,
    pub loop_frames: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            model: None,
            mode: AnalysisMode::default(),
            tensor: TensorSpec::default(),
            num_classes: NUM_CLASSES,
            top_k: 3,
            labels_path: None,
            output_name: None,
            moving_avg_period: 10,
            frame_buffer_size: 4,
            event_buffer_size: 16,
            frame_interval_ms: 0,
            backpressure: Backpressure::default(),
            analyzer_timeout_ms: None,
            output_dir: None,
            rotation_degrees: 0,
            raw_yuv: None,
            loop_frames: false,
        }
    }
}

impl Configuration {
    /// Defaults, then the optional file, then `SEGCAM_*` environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let configuration: Configuration = settings.try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.tensor.width == 0 || self.tensor.height == 0 {
            return Err(AppError::Config("tensor dimensions must be positive".to_string()));
        }
        if self.tensor.std.iter().any(|s| *s == 0.0) {
            return Err(AppError::Config("normalization std must be non-zero".to_string()));
        }
        if self.moving_avg_period == 0 {
            return Err(AppError::Config("moving_avg_period must be positive".to_string()));
        }
        if self.num_classes == 0 || self.num_classes > MAX_CLASSES {
            return Err(AppError::Config(format!(
                "num_classes must be between 1 and {MAX_CLASSES}"
            )));
        }
        Ok(())
    }
}
