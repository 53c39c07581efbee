use anyhow::{ensure, Result};
use image::DynamicImage;
use rand::Rng;

// ============================================================================
// CropSpec
// ============================================================================

/// One crop offset and flip decision, applied identically to every frame of a
/// sample's input and target window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropSpec {
    pub offset_y: u32,
    pub offset_x: u32,
    pub flip: bool,
}

// ============================================================================
// SpatialTransform
// ============================================================================

/// Consistent random crop + horizontal flip across a whole frame sequence.
///
/// Offsets are drawn uniformly so that the crop always lies inside the source frame.
/// When a HUD row is configured (game frames with a score strip at the bottom), a
/// candidate whose crop reaches into that strip is never flipped: mirroring would
/// put the score board where the model never sees it otherwise.
///
/// # Example
/// ```ignore
/// let spatial = SpatialTransform::new((210, 160), Some((32, 32)), Some(172))?;
/// let spec = spatial.draw(&mut rng, true);
/// let cropped = spatial.apply(&spec, &frames);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialTransform {
    frame_size: (u32, u32),
    crop_size: Option<(u32, u32)>,
    hud_y: Option<u32>,
}

impl SpatialTransform {
    /// Sizes are `(height, width)`. A crop must be strictly smaller than the frame
    /// in both dimensions.
    pub fn new(
        frame_size: (u32, u32),
        crop_size: Option<(u32, u32)>,
        hud_y: Option<u32>,
    ) -> Result<Self> {
        let (height, width) = frame_size;
        ensure!(
            height > 0 && width > 0,
            "Frame size must be positive (got {}x{})",
            height,
            width
        );
        if let Some((crop_h, crop_w)) = crop_size {
            ensure!(
                crop_h > 0 && crop_w > 0,
                "Crop size must be positive (got {}x{})",
                crop_h,
                crop_w
            );
            ensure!(
                crop_h < height && crop_w < width,
                "Frame size {}x{} has to be larger than the crop size {}x{}",
                height,
                width,
                crop_h,
                crop_w
            );
        }
        Ok(Self {
            frame_size,
            crop_size,
            hud_y,
        })
    }

    /// `(height, width)` of every transformed frame.
    pub fn output_size(&self) -> (u32, u32) {
        self.crop_size.unwrap_or(self.frame_size)
    }

    pub fn crops(&self) -> bool {
        self.crop_size.is_some()
    }

    /// Whether a crop starting at `offset_y` reaches the HUD strip.
    pub fn shows_hud(&self, offset_y: u32) -> bool {
        match (self.crop_size, self.hud_y) {
            (Some((crop_h, _)), Some(hud_y)) => offset_y + crop_h > hud_y,
            _ => false,
        }
    }

    /// Draws a new candidate. `flip` is the sample's flip wish; it is dropped when
    /// the drawn crop shows the HUD.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R, flip: bool) -> CropSpec {
        let Some((crop_h, crop_w)) = self.crop_size else {
            return CropSpec {
                offset_y: 0,
                offset_x: 0,
                flip,
            };
        };
        let (height, width) = self.frame_size;
        let offset_x = rng.random_range(0..=width - crop_w);
        let offset_y = rng.random_range(0..=height - crop_h);

        CropSpec {
            offset_y,
            offset_x,
            flip: flip && !self.shows_hud(offset_y),
        }
    }

    /// Applies `spec` to every frame.
    pub fn apply(&self, spec: &CropSpec, frames: &[DynamicImage]) -> Vec<DynamicImage> {
        frames.iter().map(|frame| self.apply_one(spec, frame)).collect()
    }

    fn apply_one(&self, spec: &CropSpec, frame: &DynamicImage) -> DynamicImage {
        debug_assert_eq!(
            (frame.height(), frame.width()),
            self.frame_size,
            "frame does not match the configured source size"
        );
        let cropped = match self.crop_size {
            Some((crop_h, crop_w)) => {
                frame.crop_imm(spec.offset_x, spec.offset_y, crop_w, crop_h)
            }
            None => frame.clone(),
        };
        if spec.flip {
            cropped.fliph()
        } else {
            cropped
        }
    }
}
