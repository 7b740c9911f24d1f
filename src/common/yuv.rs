use crate::error::AppError;

/// One plane of a YUV 4:2:0 image as a camera hands it over.
#[derive(Debug, Clone)]
pub struct YuvPlane {
    pub data: Vec<u8>,
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl YuvPlane {
    #[inline]
    fn sample(&self, x: usize, y: usize) -> u8 {
        self.data
            .get(y * self.row_stride + x * self.pixel_stride)
            .copied()
            .unwrap_or(0)
    }
}

/// YUV 4:2:0 frame. Chroma planes are subsampled by two in both directions.
#[derive(Debug, Clone)]
pub struct Yuv420Image {
    width: u32,
    height: u32,
    y: YuvPlane,
    u: YuvPlane,
    v: YuvPlane,
}

impl Yuv420Image {
    pub fn new(
        width: u32,
        height: u32,
        y: YuvPlane,
        u: YuvPlane,
        v: YuvPlane,
    ) -> Result<Self, AppError> {
        if width == 0 || height == 0 {
            return Err(AppError::Preprocessing("empty YUV frame".to_string()));
        }
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
        check_plane("Y", &y, w, h)?;
        check_plane("U", &u, cw, ch)?;
        check_plane("V", &v, cw, ch)?;
        Ok(Self {
            width,
            height,
            y,
            u,
            v,
        })
    }

    /// Builds a frame from tightly packed planar I420 bytes (Y, then U, then V).
    pub fn from_i420(width: u32, height: u32, bytes: &[u8]) -> Result<Self, AppError> {
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
        let luma = w * h;
        let chroma = cw * ch;
        if bytes.len() != luma + 2 * chroma {
            return Err(AppError::Preprocessing(format!(
                "I420 frame {width}x{height} needs {} bytes, got {}",
                luma + 2 * chroma,
                bytes.len()
            )));
        }
        let plane = |range: std::ops::Range<usize>, row_stride| YuvPlane {
            data: bytes[range].to_vec(),
            row_stride,
            pixel_stride: 1,
        };
        Self::new(
            width,
            height,
            plane(0..luma, w),
            plane(luma..luma + chroma, cw),
            plane(luma + chroma..luma + 2 * chroma, cw),
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Converts the pixel at `(x, y)` to RGB with the integer BT.601 formula.
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let (x, y) = (x as usize, y as usize);
        let yi = (self.y.sample(x, y) as i32 - 16).max(0);
        let ui = self.u.sample(x / 2, y / 2) as i32 - 128;
        let vi = self.v.sample(x / 2, y / 2) as i32 - 128;

        let a0 = 1192 * yi;
        let r = (a0 + 1634 * vi) >> 10;
        let g = (a0 - 833 * vi - 400 * ui) >> 10;
        let b = (a0 + 2066 * ui) >> 10;
        [clamp_channel(r), clamp_channel(g), clamp_channel(b)]
    }
}

fn clamp_channel(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

fn check_plane(name: &str, plane: &YuvPlane, width: usize, height: usize) -> Result<(), AppError> {
    if plane.pixel_stride == 0 {
        return Err(AppError::Preprocessing(format!(
            "{name} plane has a zero pixel stride"
        )));
    }
    let needed = (height - 1) * plane.row_stride + (width - 1) * plane.pixel_stride + 1;
    if plane.data.len() < needed {
        return Err(AppError::Preprocessing(format!(
            "{name} plane holds {} bytes, needs at least {needed}",
            plane.data.len()
        )));
    }
    Ok(())
}
