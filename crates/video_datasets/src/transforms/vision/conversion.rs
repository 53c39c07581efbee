use crate::transforms::Transform;
use anyhow::{ensure, Result};
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

/// Channel depth every frame of a dataset is converted to.
///
/// | Depth  | Channels | Pixel layout |
/// |--------|----------|--------------|
/// | `Gray` | 1        | `L`          |
/// | `Rgb`  | 3        | `R, G, B`    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FrameDepth {
    Gray,
    #[default]
    Rgb,
}

impl FrameDepth {
    pub fn channels(self) -> usize {
        match self {
            FrameDepth::Gray => 1,
            FrameDepth::Rgb => 3,
        }
    }
}

// ============================================================================
// EnsureDepth
// ============================================================================

/// Converts a decoded frame to a fixed channel depth so that every frame of a
/// sequence has the same byte layout.
#[derive(Debug, Clone, Copy)]
pub struct EnsureDepth {
    depth: FrameDepth,
}

impl EnsureDepth {
    pub fn new(depth: FrameDepth) -> Self {
        Self { depth }
    }

    pub fn rgb() -> Self {
        Self::new(FrameDepth::Rgb)
    }

    pub fn gray() -> Self {
        Self::new(FrameDepth::Gray)
    }
}

impl Transform<DynamicImage, DynamicImage> for EnsureDepth {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let (width, height) = img.dimensions();
        ensure!(
            width > 0 && height > 0,
            "Frame dimensions must be positive (got {}x{})",
            width,
            height
        );

        Ok(match (self.depth, img) {
            (FrameDepth::Rgb, img @ DynamicImage::ImageRgb8(_)) => img,
            (FrameDepth::Gray, img @ DynamicImage::ImageLuma8(_)) => img,
            (FrameDepth::Rgb, img) => DynamicImage::ImageRgb8(img.to_rgb8()),
            (FrameDepth::Gray, img) => DynamicImage::ImageLuma8(img.to_luma8()),
        })
    }
}

// ============================================================================
// EnsureSize
// ============================================================================

/// Rejects frames whose `(height, width)` differs from the size a dataset was
/// configured with. Crop offsets are drawn against that size, so a single
/// odd-sized recording would otherwise produce clamped crops.
#[derive(Debug, Clone, Copy)]
pub struct EnsureSize {
    height: u32,
    width: u32,
}

impl EnsureSize {
    /// `frame_size` is `(height, width)`.
    pub fn new(frame_size: (u32, u32)) -> Self {
        let (height, width) = frame_size;
        Self { height, width }
    }
}

impl Transform<DynamicImage, DynamicImage> for EnsureSize {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let (width, height) = img.dimensions();
        ensure!(
            (height, width) == (self.height, self.width),
            "Frame is {}x{}, but the dataset expects {}x{}",
            height,
            width,
            self.height,
            self.width
        );
        Ok(img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_rgba_becomes_rgb() -> Result<()> {
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(1, 1, Rgba([10, 20, 30, 255]));

        let frame = EnsureDepth::rgb().apply(DynamicImage::ImageRgba8(img))?;
        assert!(matches!(frame, DynamicImage::ImageRgb8(_)));
        assert_eq!(frame.as_bytes().len(), 2 * 2 * 3);
        assert_eq!(frame.to_rgb8().get_pixel(1, 1), &Rgb([10, 20, 30]));
        Ok(())
    }

    #[test]
    fn test_rgb_becomes_gray() -> Result<()> {
        let img = RgbImage::from_pixel(3, 2, Rgb([255, 255, 255]));
        let frame = EnsureDepth::gray().apply(DynamicImage::ImageRgb8(img))?;
        assert!(matches!(frame, DynamicImage::ImageLuma8(_)));
        assert_eq!(frame.as_bytes(), &[255u8; 6]);
        Ok(())
    }

    #[test]
    fn test_size_mismatch_is_rejected() -> Result<()> {
        let check = EnsureSize::new((2, 3));
        let frame = check.apply(DynamicImage::ImageRgb8(RgbImage::new(3, 2)))?;
        assert_eq!(frame.dimensions(), (3, 2));

        let err = check
            .apply(DynamicImage::ImageRgb8(RgbImage::new(2, 3)))
            .unwrap_err();
        assert!(err.to_string().contains("expects 2x3"));
        Ok(())
    }
}
