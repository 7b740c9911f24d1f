use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::common::{Frame, FramePixels, Rotation, Yuv420Image};
use crate::error::AppError;

/// Produces camera frames one at a time. `Ok(None)` ends the stream.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>, AppError>;
    fn describe(&self) -> String;
}

/// Dimensions of headerless I420 frames stored as `*.yuv` files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RawYuvDimensions {
    pub width: u32,
    pub height: u32,
}

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];
const YUV_EXTENSION: &str = "yuv";

/// Replays the image files of a directory in name order.
pub struct ImageFolderSource {
    directory: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    sequence: u64,
    rotation: Rotation,
    raw_yuv: Option<RawYuvDimensions>,
    looping: bool,
}

impl ImageFolderSource {
    pub fn open(
        directory: &Path,
        rotation: Rotation,
        raw_yuv: Option<RawYuvDimensions>,
        looping: bool,
    ) -> Result<Self, AppError> {
        let entries = std::fs::read_dir(directory).map_err(|e| {
            AppError::Intake(format!("cannot read {}: {e}", directory.display()))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_frame_file(&path, raw_yuv.is_some()) {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(AppError::Intake(format!(
                "no frame files found in {}",
                directory.display()
            )));
        }
        info!("Found {} frame files in {}", files.len(), directory.display());

        Ok(Self {
            directory: directory.to_path_buf(),
            files,
            cursor: 0,
            sequence: 0,
            rotation,
            raw_yuv,
            looping,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn decode(&self, path: &Path) -> Result<FramePixels, AppError> {
        match (extension_of(path).as_deref(), self.raw_yuv) {
            (Some(YUV_EXTENSION), Some(dims)) => {
                let bytes = std::fs::read(path)?;
                let image = Yuv420Image::from_i420(dims.width, dims.height, &bytes)?;
                Ok(FramePixels::Yuv420(image))
            }
            _ => Ok(FramePixels::Rgb(image::open(path)?.to_rgb8())),
        }
    }
}

impl FrameSource for ImageFolderSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, AppError> {
        if self.cursor >= self.files.len() {
            if !self.looping {
                return Ok(None);
            }
            self.cursor = 0;
        }

        let path = &self.files[self.cursor];
        debug!("Reading frame {} from {}", self.sequence, path.display());
        let pixels = self.decode(path)?;
        let frame = Frame::new(self.sequence, pixels, self.rotation);

        self.cursor += 1;
        self.sequence += 1;
        Ok(Some(frame))
    }

    fn describe(&self) -> String {
        format!("{} ({} files)", self.directory.display(), self.files.len())
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn is_frame_file(path: &Path, accept_yuv: bool) -> bool {
    match extension_of(path) {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => true,
        Some(ext) => accept_yuv && ext == YUV_EXTENSION,
        None => false,
    }
}
