use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::catalog::{default_model, resolve_model};
use crate::config::{AnalysisMode, Configuration};
use crate::error::AppError;
use crate::pipeline::domain::Labels;
use crate::pipeline::orchestration::{AnalyzerStep, ClassificationAnalyzer, ProcessingPipeline, SegmentationAnalyzer};
use crate::runtime::ModuleLoader;

pub trait PipelineFactory {
    fn build(&self) -> Result<ProcessingPipeline, AppError>;
}

/// Builds the analyzer chosen by the configuration, loading the module lazily.
pub struct ConfiguredPipelineFactory<'a> {
    configuration: &'a Configuration,
}

impl<'a> ConfiguredPipelineFactory<'a> {
    pub fn new(configuration: &'a Configuration) -> Self {
        Self { configuration }
    }

    pub fn model_path(&self) -> PathBuf {
        let name = self
            .configuration
            .model
            .as_deref()
            .unwrap_or_else(|| default_model(self.configuration.mode));
        resolve_model(name, &self.configuration.model_dir)
    }

    fn analyzer(&self, loader: Arc<ModuleLoader>) -> Result<Box<dyn AnalyzerStep>, AppError> {
        let configuration = self.configuration;
        let analyzer: Box<dyn AnalyzerStep> = match configuration.mode {
            AnalysisMode::Segment => {
                let mut analyzer = SegmentationAnalyzer::new(loader, configuration.tensor)
                    .with_classes(configuration.num_classes);
                if let Some(name) = &configuration.output_name {
                    analyzer = analyzer.with_output_name(name.clone());
                }
                Box::new(analyzer)
            }
            AnalysisMode::Classify => {
                let labels = match &configuration.labels_path {
                    Some(path) => Labels::from_file(path)?,
                    None => Labels::imagenet(),
                };
                let mut analyzer = ClassificationAnalyzer::new(loader, configuration.tensor, labels)
                    .with_top_k(configuration.top_k);
                if let Some(name) = &configuration.output_name {
                    analyzer = analyzer.with_output_name(name.clone());
                }
                Box::new(analyzer)
            }
        };
        Ok(analyzer)
    }
}

impl PipelineFactory for ConfiguredPipelineFactory<'_> {
    fn build(&self) -> Result<ProcessingPipeline, AppError> {
        let model_path = self.model_path();
        info!("Using model {} ({:?})", model_path.display(), self.configuration.mode);
        let loader = Arc::new(ModuleLoader::tract(model_path, self.configuration.tensor));
        let pipeline = ProcessingPipeline::builder(self.analyzer(loader)?)
            .maybe_analyzer_timeout(self.configuration.analyzer_timeout_ms.map(Duration::from_millis))
            .build();
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn picks_the_default_model_per_mode() {
        let configuration = Configuration::default();
        let factory = ConfiguredPipelineFactory::new(&configuration);
        assert_eq!(factory.model_path(), Path::new("models").join("deeplabv3.onnx"));

        let configuration = Configuration {
            mode: AnalysisMode::Classify,
            ..Configuration::default()
        };
        assert_eq!(
            ConfiguredPipelineFactory::new(&configuration).model_path(),
            Path::new("models").join("resnet18.onnx")
        );
    }

    #[test]
    fn builds_the_configured_analyzer_without_loading() {
        let configuration = Configuration {
            mode: AnalysisMode::Classify,
            model: Some("missing/custom.onnx".to_string()),
            ..Configuration::default()
        };
        let pipeline = ConfiguredPipelineFactory::new(&configuration).build().unwrap();
        assert_eq!(pipeline.analyzer_name(), "classification");
    }

    #[tokio::test]
    async fn missing_model_fails_on_first_frame() {
        use crate::common::{Frame, FramePixels, Rotation};
        use image::{Rgb, RgbImage};

        let configuration = Configuration {
            model: Some("missing/custom.onnx".to_string()),
            ..Configuration::default()
        };
        let mut pipeline = ConfiguredPipelineFactory::new(&configuration).build().unwrap();
        let frame = Frame::new(
            0,
            FramePixels::Rgb(RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]))),
            Rotation::None,
        );
        let err = pipeline.process(frame).await.err().unwrap();
        assert!(matches!(err, AppError::ModuleLoad { .. }));
        assert!(pipeline.is_halted());
    }

    #[test]
    fn missing_labels_file_is_an_error() {
        let configuration = Configuration {
            mode: AnalysisMode::Classify,
            labels_path: Some(PathBuf::from("no/labels.txt")),
            ..Configuration::default()
        };
        assert!(ConfiguredPipelineFactory::new(&configuration).build().is_err());
    }
}
