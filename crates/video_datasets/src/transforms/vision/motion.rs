use image::DynamicImage;

/// Minimum squared L2 difference per frame, measured on the [-1, 1] pixel scale.
pub const MIN_L2_DIFF_PER_FRAME: f64 = 25.0;

/// Scales 8-bit pixels to a range of width 2, matching a [-1, 1] input encoding.
const PIXEL_SCALE: f64 = 127.5;

/// Rejects near-static frame windows.
///
/// The squared L2 difference of consecutive frames is accumulated from the last pair
/// towards the first. The window passes as soon as the running sum reaches
/// `threshold * frame_count`, and fails if the walk ends below it.
///
/// With `reject_static_tail` enabled, the first pair evaluated (the last two frames)
/// must differ at all, otherwise the window fails immediately. This asymmetric check
/// only exists for the last pair and is what separates this filter from a plain
/// sum-over-threshold test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionFilter {
    threshold: f64,
    reject_static_tail: bool,
}

impl Default for MotionFilter {
    fn default() -> Self {
        Self::new(MIN_L2_DIFF_PER_FRAME)
    }
}

impl MotionFilter {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            reject_static_tail: true,
        }
    }

    /// Disables the early rejection on an unchanged final frame pair.
    pub fn without_static_tail_check(mut self) -> Self {
        self.reject_static_tail = false;
        self
    }

    pub fn has_enough_motion(&self, frames: &[DynamicImage]) -> bool {
        let n = frames.len();
        if n < 2 {
            return false;
        }
        let limit = self.threshold * n as f64;

        let mut diff = 0.0;
        for i in (0..n - 1).rev() {
            diff += squared_l2(frames[i].as_bytes(), frames[i + 1].as_bytes());

            if self.reject_static_tail && i == n - 2 && diff == 0.0 {
                return false;
            }
            if diff >= limit {
                return true;
            }
        }
        false
    }
}

fn squared_l2(a: &[u8], b: &[u8]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "frames of one window must share a layout");
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = (x as f64 - y as f64) / PIXEL_SCALE;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn gray(value: u8, size: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(size, size, Luma([value])))
    }

    #[test]
    fn identical_frames_have_no_motion() {
        let frames = vec![gray(90, 8); 6];
        assert!(!MotionFilter::default().has_enough_motion(&frames));
        assert!(!MotionFilter::default()
            .without_static_tail_check()
            .has_enough_motion(&frames));
    }

    #[test]
    fn strong_increasing_deltas_pass() {
        // 32x32 frames, each step of 60 contributes ~227 on the [-1, 1] scale.
        let frames: Vec<_> = (0..5u8).map(|i| gray(i * 60, 32)).collect();
        assert!(MotionFilter::default().has_enough_motion(&frames));
    }

    #[test]
    fn too_few_frames_never_pass() {
        assert!(!MotionFilter::default().has_enough_motion(&[]));
        assert!(!MotionFilter::default().has_enough_motion(&[gray(255, 4)]));
    }

    #[test]
    fn static_tail_fails_even_with_early_motion() {
        // Large jump between frames 0 and 1, nothing afterwards.
        let frames = vec![gray(0, 16), gray(255, 16), gray(255, 16), gray(255, 16)];

        assert!(!MotionFilter::default().has_enough_motion(&frames));
        // Same window passes once the tail check is off: 1024 >= 25 * 4.
        assert!(MotionFilter::default()
            .without_static_tail_check()
            .has_enough_motion(&frames));
    }

    #[test]
    fn threshold_scales_with_frame_count() {
        // Each 4x4 pair contributes 16 * (2.0)^2 = 64 on the [-1, 1] scale.
        let frames = vec![gray(0, 4), gray(255, 4), gray(0, 4)];
        assert!(MotionFilter::new(42.0).has_enough_motion(&frames)); // 128 >= 126
        assert!(!MotionFilter::new(43.0).has_enough_motion(&frames)); // 128 < 129
    }
}
