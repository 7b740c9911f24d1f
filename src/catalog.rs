use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::AnalysisMode;

/// How a classification result is laid out for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoView {
    QuantizedMobilenet,
    Resnet,
    Segmentation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPreset {
    pub key: &'static str,
    pub display_name: &'static str,
    pub asset: &'static str,
    pub mode: AnalysisMode,
    pub info_view: InfoView,
}

impl fmt::Display for ModelPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            AnalysisMode::Segment => "segment",
            AnalysisMode::Classify => "classify",
        };
        write!(f, "{:<20} {:<9} {:<24} {}", self.key, mode, self.asset, self.display_name)
    }
}

const fn classifier(
    key: &'static str,
    display_name: &'static str,
    asset: &'static str,
    info_view: InfoView,
) -> ModelPreset {
    ModelPreset {
        key,
        display_name,
        asset,
        mode: AnalysisMode::Classify,
        info_view,
    }
}

pub const PRESETS: [ModelPreset; 9] = [
    classifier("inception", "Inception v3", "inception.onnx", InfoView::QuantizedMobilenet),
    classifier("mobilenet_v2", "MobileNet v2 (quantized)", "mobilenet_v2.onnx", InfoView::QuantizedMobilenet),
    classifier("mobilenet_v2_script", "MobileNet v2 (scripted)", "mobilenet_v2_script.onnx", InfoView::Resnet),
    classifier("mobilenet_v2_trace", "MobileNet v2 (traced)", "mobilenet_v2_trace.onnx", InfoView::Resnet),
    classifier("resnet18", "ResNet-18", "resnet18.onnx", InfoView::Resnet),
    classifier("resnet18_script", "ResNet-18 (scripted)", "resnet18_script.onnx", InfoView::Resnet),
    classifier("resnet18_trace", "ResNet-18 (traced)", "resnet18_trace.onnx", InfoView::Resnet),
    classifier("vgg", "VGG", "vgg.onnx", InfoView::QuantizedMobilenet),
    ModelPreset {
        key: "deeplabv3",
        display_name: "DeepLabV3 segmentation",
        asset: "deeplabv3.onnx",
        mode: AnalysisMode::Segment,
        info_view: InfoView::Segmentation,
    },
];

pub const DEFAULT_SEGMENTATION_MODEL: &str = "deeplabv3";
pub const DEFAULT_CLASSIFICATION_MODEL: &str = "resnet18";

pub fn find_preset(key: &str) -> Option<&'static ModelPreset> {
    PRESETS.iter().find(|preset| preset.key.eq_ignore_ascii_case(key))
}

pub fn default_model(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::Segment => DEFAULT_SEGMENTATION_MODEL,
        AnalysisMode::Classify => DEFAULT_CLASSIFICATION_MODEL,
    }
}

/// A catalog key resolves to its asset inside `model_dir`; anything else is a path.
pub fn resolve_model(name_or_path: &str, model_dir: &Path) -> PathBuf {
    match find_preset(name_or_path) {
        Some(preset) => model_dir.join(preset.asset),
        None => PathBuf::from(name_or_path),
    }
}
