use chrono::{DateTime, Utc};
use image::RgbImage;
use std::sync::Arc;
use uuid::Uuid;

use crate::common::yuv::Yuv420Image;
use crate::error::AppError;

/// Clockwise rotation that brings a captured frame upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    pub fn from_degrees(degrees: u32) -> Result<Self, AppError> {
        match degrees % 360 {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Cw90),
            180 => Ok(Rotation::Cw180),
            270 => Ok(Rotation::Cw270),
            _ => Err(AppError::Config(format!(
                "rotation must be a multiple of 90 degrees, got {degrees}"
            ))),
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }

    /// Whether width and height trade places after rotating.
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Cw270)
    }
}

#[derive(Debug)]
pub enum FramePixels {
    Rgb(RgbImage),
    Yuv420(Yuv420Image),
}

impl FramePixels {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            FramePixels::Rgb(image) => image.dimensions(),
            FramePixels::Yuv420(image) => (image.width(), image.height()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Frame {
    frame_id: Uuid,
    sequence: u64,
    pixels: Arc<FramePixels>,
    rotation: Rotation,
    captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(sequence: u64, pixels: FramePixels, rotation: Rotation) -> Self {
        Self {
            frame_id: Uuid::new_v4(),
            sequence,
            pixels: Arc::new(pixels),
            rotation,
            captured_at: Utc::now(),
        }
    }

    pub fn frame_id(&self) -> Uuid {
        self.frame_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn pixels(&self) -> &FramePixels {
        &self.pixels
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn cloning_frame_shares_pixel_buffer() {
        let img = RgbImage::from_pixel(16, 16, Rgb([1, 2, 3]));
        let f1 = Frame::new(0, FramePixels::Rgb(img), Rotation::None);
        let f2 = f1.clone();
        assert!(Arc::ptr_eq(&f1.pixels, &f2.pixels));
        assert_eq!(f1.frame_id(), f2.frame_id());
    }

    #[test]
    fn rotation_accepts_quarter_turns_only() {
        assert_eq!(Rotation::from_degrees(0).unwrap(), Rotation::None);
        assert_eq!(Rotation::from_degrees(90).unwrap(), Rotation::Cw90);
        assert_eq!(Rotation::from_degrees(450).unwrap(), Rotation::Cw90);
        assert_eq!(Rotation::from_degrees(270).unwrap().degrees(), 270);
        assert!(Rotation::from_degrees(45).is_err());
        assert!(Rotation::Cw270.swaps_axes());
        assert!(!Rotation::Cw180.swaps_axes());
    }
}
