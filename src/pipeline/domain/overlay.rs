use image::{Rgba, RgbaImage};

use crate::error::AppError;

/// Class count of the PASCAL VOC segmentation head.
pub const NUM_CLASSES: usize = 21;
pub const DOG: usize = 12;
pub const PERSON: usize = 15;
pub const SHEEP: usize = 17;

pub const TRANSPARENT: u32 = 0x0000_0000;

/// Largest class count a mask can record.
pub const MAX_CLASSES: usize = u16::MAX as usize + 1;

/// Borrowed `(class, row, column)` score tensor with validated bounds.
#[derive(Debug, Clone, Copy)]
pub struct ScoreGrid<'a> {
    scores: &'a [f32],
    classes: usize,
    height: usize,
    width: usize,
}

impl<'a> ScoreGrid<'a> {
    pub fn new(scores: &'a [f32], classes: usize, height: usize, width: usize) -> Result<Self, AppError> {
        if classes == 0 {
            return Err(AppError::Inference("score tensor has no classes".to_string()));
        }
        if classes > MAX_CLASSES {
            return Err(AppError::Inference(format!(
                "{classes} classes exceed the supported {MAX_CLASSES}"
            )));
        }
        let expected = classes * height * width;
        if scores.len() != expected {
            return Err(AppError::Inference(format!(
                "expected {classes}x{height}x{width} = {expected} scores, got {}",
                scores.len()
            )));
        }
        Ok(Self {
            scores,
            classes,
            height,
            width,
        })
    }

    pub fn classes(&self) -> usize {
        self.classes
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn score(&self, class: usize, row: usize, col: usize) -> f32 {
        self.scores[class * self.height * self.width + row * self.width + col]
    }

    /// Highest scoring class at `(row, col)`; the lowest index wins ties.
    pub fn argmax(&self, row: usize, col: usize) -> usize {
        let mut best_class = 0;
        let mut best_score = f32::NEG_INFINITY;
        for class in 0..self.classes {
            let score = self.score(class, row, col);
            if score > best_score {
                best_score = score;
                best_class = class;
            }
        }
        best_class
    }
}

/// Opaque ARGB colors for the classes that get painted.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPalette {
    entries: Vec<(usize, u32)>,
}

impl Default for OverlayPalette {
    fn default() -> Self {
        Self {
            entries: vec![(PERSON, 0xFFFF_0000), (DOG, 0xFF00_FF00), (SHEEP, 0xFF00_00FF)],
        }
    }
}

impl OverlayPalette {
    pub fn empty() -> Self {
        Self { entries: vec![] }
    }

    pub fn with_color(mut self, class: usize, argb: u32) -> Self {
        self.entries.retain(|(c, _)| *c != class);
        self.entries.push((class, argb));
        self
    }

    pub fn color(&self, class: usize) -> u32 {
        self.entries
            .iter()
            .find(|(c, _)| *c == class)
            .map(|(_, argb)| *argb)
            .unwrap_or(TRANSPARENT)
    }

    pub fn classes(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|(c, _)| *c)
    }
}

/// Per-pixel argmax result: ARGB colors plus the winning class of every pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationMask {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
    classes: Vec<u16>,
}

impl SegmentationMask {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// ARGB pixels, row-major.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, row: usize, col: usize) -> u32 {
        self.pixels[row * self.width + col]
    }

    pub fn class_at(&self, row: usize, col: usize) -> usize {
        self.classes[row * self.width + col] as usize
    }

    /// Fraction of pixels won by `class`.
    pub fn coverage(&self, class: usize) -> f32 {
        if self.classes.is_empty() {
            return 0.0;
        }
        let hits = self.classes.iter().filter(|c| **c as usize == class).count();
        hits as f32 / self.classes.len() as f32
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let argb = self.pixel(y as usize, x as usize);
            Rgba([
                (argb >> 16) as u8,
                (argb >> 8) as u8,
                argb as u8,
                (argb >> 24) as u8,
            ])
        })
    }
}

/// Maps every pixel to the palette color of its highest scoring class.
pub fn argmax_overlay(grid: &ScoreGrid<'_>, palette: &OverlayPalette) -> SegmentationMask {
    let (height, width) = (grid.height(), grid.width());
    let mut pixels = vec![TRANSPARENT; height * width];
    let mut classes = vec![0u16; height * width];
    for row in 0..height {
        for col in 0..width {
            let class = grid.argmax(row, col);
            pixels[row * width + col] = palette.color(class);
            // ScoreGrid caps the class count at MAX_CLASSES.
            classes[row * width + col] = class as u16;
        }
    }
    SegmentationMask {
        width,
        height,
        pixels,
        classes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn grid_from(classes: usize, height: usize, width: usize, scores: &[f32]) -> ScoreGrid<'_> {
        ScoreGrid::new(scores, classes, height, width).unwrap()
    }

    #[test]
    fn colors_person_dog_sheep_and_clears_the_rest() {
        // One row, four pixels; class 0 everywhere except where noted.
        let (h, w) = (1, 4);
        let mut scores = vec![0.0f32; NUM_CLASSES * h * w];
        scores[PERSON * 4] = 5.0;
        scores[DOG * 4 + 1] = 5.0;
        scores[SHEEP * 4 + 2] = 5.0;
        scores[3 * 4 + 3] = 5.0;

        let mask = argmax_overlay(&grid_from(NUM_CLASSES, h, w, &scores), &OverlayPalette::default());
        assert_eq!(mask.pixels(), &[0xFFFF0000, 0xFF00FF00, 0xFF0000FF, 0x00000000]);
        assert_eq!(mask.class_at(0, 3), 3);
    }

    #[test]
    fn ties_go_to_the_lowest_class() {
        let mut scores = vec![0.0f32; NUM_CLASSES];
        scores[DOG] = 2.0;
        scores[PERSON] = 2.0;
        let mask = argmax_overlay(&grid_from(NUM_CLASSES, 1, 1, &scores), &OverlayPalette::default());
        assert_eq!(mask.class_at(0, 0), DOG);
        assert_eq!(mask.pixel(0, 0), 0xFF00FF00);

        let flat = vec![1.0f32; NUM_CLASSES];
        let mask = argmax_overlay(&grid_from(NUM_CLASSES, 1, 1, &flat), &OverlayPalette::default());
        assert_eq!(mask.class_at(0, 0), 0);
        assert_eq!(mask.pixel(0, 0), TRANSPARENT);
    }

    #[test]
    fn nan_never_wins() {
        let mut scores = vec![f32::NAN; 3];
        scores[1] = -4.0;
        let grid = grid_from(3, 1, 1, &scores);
        assert_eq!(grid.argmax(0, 0), 1);
    }

    #[test]
    fn indexes_rows_and_columns_separately() {
        // 2 classes on a 2x3 grid; class 1 wins only at row 1, column 2.
        let (h, w) = (2, 3);
        let mut scores = vec![0.0f32; 2 * h * w];
        scores[h * w + w + 2] = 1.0;
        let palette = OverlayPalette::empty().with_color(1, 0xFF123456);
        let mask = argmax_overlay(&grid_from(2, h, w, &scores), &palette);
        for row in 0..h {
            for col in 0..w {
                let expected = if (row, col) == (1, 2) { 0xFF123456 } else { TRANSPARENT };
                assert_eq!(mask.pixel(row, col), expected, "pixel ({row}, {col})");
            }
        }
        assert!((mask.coverage(1) - 1.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn random_scores_match_reference_argmax() {
        let mut rng = rand::rng();
        let (h, w) = (7, 5);
        let palette = OverlayPalette::default();
        for _ in 0..20 {
            // Small integer scores make ties common.
            let scores: Vec<f32> = (0..NUM_CLASSES * h * w)
                .map(|_| rng.random_range(0..4) as f32)
                .collect();
            let mask = argmax_overlay(&grid_from(NUM_CLASSES, h, w, &scores), &palette);
            for row in 0..h {
                for col in 0..w {
                    let at = |c: usize| scores[c * h * w + row * w + col];
                    let max = (0..NUM_CLASSES).map(at).fold(f32::MIN, f32::max);
                    let expected = (0..NUM_CLASSES).find(|c| at(*c) == max).unwrap();
                    assert_eq!(mask.class_at(row, col), expected);
                    assert_eq!(mask.pixel(row, col), palette.color(expected));
                }
            }
        }
    }

    #[test]
    fn records_class_indices_beyond_a_byte() {
        let classes = 300;
        let mut scores = vec![0.0f32; classes * 2];
        scores[299 * 2] = 1.0;
        scores[256 * 2 + 1] = 1.0;
        let mask = argmax_overlay(&grid_from(classes, 1, 2, &scores), &OverlayPalette::default());
        assert_eq!(mask.class_at(0, 0), 299);
        assert_eq!(mask.class_at(0, 1), 256);
        assert!((mask.coverage(299) - 0.5).abs() < 1e-6);
        assert_eq!(mask.coverage(255), 0.0);
    }

    #[test]
    fn rejects_mismatched_lengths() {
        assert!(ScoreGrid::new(&[0.0; 10], NUM_CLASSES, 1, 1).is_err());
        assert!(ScoreGrid::new(&[], 0, 0, 0).is_err());
    }

    #[test]
    fn rgba_image_unpacks_argb() {
        let mut scores = vec![0.0f32; NUM_CLASSES * 2];
        scores[PERSON * 2 + 1] = 1.0;
        let mask = argmax_overlay(&grid_from(NUM_CLASSES, 1, 2, &scores), &OverlayPalette::default());
        let image = mask.to_rgba_image();
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(image.get_pixel(1, 0).0, [255, 0, 0, 255]);
    }
}
