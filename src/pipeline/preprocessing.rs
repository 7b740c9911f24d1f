use image::RgbImage;
use serde::Deserialize;

use crate::common::{FramePixels, Rotation, Yuv420Image};
use crate::error::AppError;
use crate::runtime::InputTensor;

pub const TORCHVISION_NORM_MEAN_RGB: [f32; 3] = [0.485, 0.456, 0.406];
pub const TORCHVISION_NORM_STD_RGB: [f32; 3] = [0.229, 0.224, 0.225];

/// Shape and normalization of the model input.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TensorSpec {
    pub width: u32,
    pub height: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for TensorSpec {
    fn default() -> Self {
        Self {
            width: 224,
            height: 224,
            mean: TORCHVISION_NORM_MEAN_RGB,
            std: TORCHVISION_NORM_STD_RGB,
        }
    }
}

impl TensorSpec {
    pub fn plane_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn tensor_len(&self) -> usize {
        3 * self.plane_len()
    }
}

/// Anything that can be sampled as RGB pixels.
pub trait PixelSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn rgb_at(&self, x: u32, y: u32) -> [u8; 3];
}

impl PixelSource for RgbImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        self.get_pixel(x, y).0
    }
}

impl PixelSource for Yuv420Image {
    fn width(&self) -> u32 {
        Yuv420Image::width(self)
    }

    fn height(&self) -> u32 {
        Yuv420Image::height(self)
    }

    fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        Yuv420Image::rgb_at(self, x, y)
    }
}

/// Reusable input tensor, allocated once per analyzer.
pub struct TensorBuffer {
    spec: TensorSpec,
    tensor: InputTensor,
}

impl TensorBuffer {
    pub fn new(spec: TensorSpec) -> Self {
        Self {
            spec,
            tensor: InputTensor::image(3, spec.height as usize, spec.width as usize),
        }
    }

    pub fn spec(&self) -> &TensorSpec {
        &self.spec
    }

    /// Converts the frame pixels into the buffer and returns the filled tensor.
    pub fn fill(&mut self, pixels: &FramePixels, rotation: Rotation) -> Result<&InputTensor, AppError> {
        match pixels {
            FramePixels::Rgb(image) => {
                center_crop_to_tensor(image, rotation, &self.spec, self.tensor.data_mut())?
            }
            FramePixels::Yuv420(image) => {
                center_crop_to_tensor(image, rotation, &self.spec, self.tensor.data_mut())?
            }
        }
        Ok(&self.tensor)
    }
}

/// Center-crops `source` to the tensor aspect ratio, rotates it clockwise,
/// scales it to the tensor size and writes normalized values into `out` in
/// `(channel, row, column)` order.
pub fn center_crop_to_tensor<P: PixelSource + ?Sized>(
    source: &P,
    rotation: Rotation,
    spec: &TensorSpec,
    out: &mut [f32],
) -> Result<(), AppError> {
    let (src_w, src_h) = (source.width(), source.height());
    if src_w == 0 || src_h == 0 {
        return Err(AppError::Preprocessing("frame has no pixels".to_string()));
    }
    if spec.width == 0 || spec.height == 0 {
        return Err(AppError::Preprocessing(
            "tensor dimensions must be positive".to_string(),
        ));
    }
    if out.len() != spec.tensor_len() {
        return Err(AppError::Preprocessing(format!(
            "tensor buffer holds {} values, expected {}",
            out.len(),
            spec.tensor_len()
        )));
    }

    let (tw, th) = (spec.width, spec.height);
    let (rot_w, rot_h) = if rotation.swaps_axes() {
        (src_h, src_w)
    } else {
        (src_w, src_h)
    };

    // Largest centered crop with the tensor's aspect ratio, in upright space.
    let (mut crop_w, mut crop_h) = (rot_w as f32, rot_h as f32);
    if tw as u64 * rot_h as u64 <= th as u64 * rot_w as u64 {
        crop_w = (tw as f32 * rot_h as f32 / th as f32).floor();
    } else {
        crop_h = (th as f32 * rot_w as f32 / tw as f32).floor();
    }
    let (crop_w_src, crop_h_src) = if rotation.swaps_axes() {
        (crop_h, crop_w)
    } else {
        (crop_w, crop_h)
    };
    let offset_x = ((src_w as f32 - crop_w_src) / 2.0).floor() as u32;
    let offset_y = ((src_h as f32 - crop_h_src) / 2.0).floor() as u32;
    let scale = crop_w / tw as f32;

    let plane = spec.plane_len();
    for y in 0..th {
        for x in 0..tw {
            let (bx, by) = match rotation {
                Rotation::None => (x, y),
                Rotation::Cw90 => (y, tw - 1 - x),
                Rotation::Cw180 => (tw - 1 - x, th - 1 - y),
                Rotation::Cw270 => (th - 1 - y, x),
            };
            let sx = (offset_x + (bx as f32 * scale) as u32).min(src_w - 1);
            let sy = (offset_y + (by as f32 * scale) as u32).min(src_h - 1);
            let rgb = source.rgb_at(sx, sy);

            let idx = y as usize * tw as usize + x as usize;
            for (c, value) in rgb.iter().enumerate() {
                out[c * plane + idx] = (*value as f32 / 255.0 - spec.mean[c]) / spec.std[c];
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn identity_spec(width: u32, height: u32) -> TensorSpec {
        TensorSpec {
            width,
            height,
            mean: [0.0; 3],
            std: [1.0; 3],
        }
    }

    fn red_channel(out: &[f32], spec: &TensorSpec) -> Vec<u8> {
        out[..spec.plane_len()]
            .iter()
            .map(|v| (v * 255.0).round() as u8)
            .collect()
    }

    /// 2x2 image whose red channel numbers the pixels 1..=4 row by row.
    fn numbered_2x2() -> RgbImage {
        RgbImage::from_fn(2, 2, |x, y| Rgb([(1 + x + 2 * y) as u8, 0, 0]))
    }

    #[test]
    fn normalizes_with_torchvision_constants() {
        let image = RgbImage::from_pixel(8, 8, Rgb([255, 0, 128]));
        let spec = TensorSpec {
            width: 4,
            height: 4,
            ..TensorSpec::default()
        };
        let mut out = vec![0.0; spec.tensor_len()];
        center_crop_to_tensor(&image, Rotation::None, &spec, &mut out).unwrap();

        let r = (1.0 - 0.485) / 0.229;
        let g = (0.0 - 0.456) / 0.224;
        let b = (128.0 / 255.0 - 0.406) / 0.225;
        assert!((out[0] - r).abs() < 1e-5);
        assert!((out[16] - g).abs() < 1e-5);
        assert!((out[32] - b).abs() < 1e-5);
    }

    #[test]
    fn crops_the_center_of_wide_frames() {
        // 6x2 frame: only columns 2 and 3 survive a square crop.
        let image = RgbImage::from_fn(6, 2, |x, _| Rgb([x as u8 * 10, 0, 0]));
        let spec = identity_spec(2, 2);
        let mut out = vec![0.0; spec.tensor_len()];
        center_crop_to_tensor(&image, Rotation::None, &spec, &mut out).unwrap();
        assert_eq!(red_channel(&out, &spec), vec![20, 30, 20, 30]);
    }

    #[test]
    fn rotates_clockwise() {
        let spec = identity_spec(2, 2);
        let mut out = vec![0.0; spec.tensor_len()];

        center_crop_to_tensor(&numbered_2x2(), Rotation::None, &spec, &mut out).unwrap();
        assert_eq!(red_channel(&out, &spec), vec![1, 2, 3, 4]);

        // [1 2; 3 4] turned a quarter clockwise is [3 1; 4 2].
        center_crop_to_tensor(&numbered_2x2(), Rotation::Cw90, &spec, &mut out).unwrap();
        assert_eq!(red_channel(&out, &spec), vec![3, 1, 4, 2]);

        center_crop_to_tensor(&numbered_2x2(), Rotation::Cw180, &spec, &mut out).unwrap();
        assert_eq!(red_channel(&out, &spec), vec![4, 3, 2, 1]);

        center_crop_to_tensor(&numbered_2x2(), Rotation::Cw270, &spec, &mut out).unwrap();
        assert_eq!(red_channel(&out, &spec), vec![2, 4, 1, 3]);
    }

    #[test]
    fn scales_down_by_sampling() {
        let image = RgbImage::from_fn(4, 4, |x, y| Rgb([(x + 4 * y) as u8, 0, 0]));
        let spec = identity_spec(2, 2);
        let mut out = vec![0.0; spec.tensor_len()];
        center_crop_to_tensor(&image, Rotation::None, &spec, &mut out).unwrap();
        assert_eq!(red_channel(&out, &spec), vec![0, 2, 8, 10]);
    }

    #[test]
    fn rejects_bad_buffers() {
        let spec = identity_spec(2, 2);
        let mut short = vec![0.0; 5];
        assert!(center_crop_to_tensor(&numbered_2x2(), Rotation::None, &spec, &mut short).is_err());

        let empty = RgbImage::new(0, 0);
        let mut out = vec![0.0; spec.tensor_len()];
        assert!(center_crop_to_tensor(&empty, Rotation::None, &spec, &mut out).is_err());
    }

    #[test]
    fn tensor_buffer_converts_yuv_frames() {
        let spec = identity_spec(2, 2);
        let mut bytes = vec![126u8; 16];
        bytes.extend([128u8; 8]);
        let yuv = Yuv420Image::from_i420(4, 4, &bytes).unwrap();

        let mut buffer = TensorBuffer::new(spec);
        let tensor = buffer
            .fill(&FramePixels::Yuv420(yuv), Rotation::None)
            .unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 2, 2]);
        assert!(tensor.data().iter().all(|v| (v - 128.0 / 255.0).abs() < 1e-6));
    }
}
