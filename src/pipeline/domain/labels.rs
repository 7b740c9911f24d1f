use std::path::Path;

use crate::error::AppError;

const PASCAL_VOC_CLASSES: [&str; 21] = [
    "background",
    "aeroplane",
    "bicycle",
    "bird",
    "boat",
    "bottle",
    "bus",
    "car",
    "cat",
    "chair",
    "cow",
    "diningtable",
    "dog",
    "horse",
    "motorbike",
    "person",
    "pottedplant",
    "sheep",
    "sofa",
    "train",
    "tvmonitor",
];

const IMAGENET_CLASSES: &str = include_str!("imagenet_classes.txt");

/// Class names by index.
#[derive(Debug, Clone, Default)]
pub struct Labels {
    names: Vec<String>,
}

impl Labels {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn pascal_voc() -> Self {
        Self::new(PASCAL_VOC_CLASSES.iter().map(|s| s.to_string()).collect())
    }

    /// The 1000 ImageNet classes the bundled classifiers predict.
    pub fn imagenet() -> Self {
        Self::parse(IMAGENET_CLASSES)
    }

    /// One label per non-empty line.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read labels {}: {e}", path.display()))
        })?;
        Ok(Self::parse(&content))
    }

    fn parse(content: &str) -> Self {
        Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name for `index`, or a generated `class N` when unknown.
    pub fn name(&self, index: usize) -> String {
        self.names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("class {index}"))
    }
}
