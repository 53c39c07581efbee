use crate::sequence::WindowSample;
use anyhow::{ensure, Context, Result};
use image::{DynamicImage, GenericImageView};
use tch::{Device, Kind, Tensor};

/// A batch of input and target frame windows ready for model input.
///
/// Both tensors are `Float` with layout `[batch_size, seq_len, height, width, channels]`
/// and values in `[0, 1]`.
///
/// # Examples
/// Suppose we collate 8 samples of 10 input and 10 target frames, cropped to 32x32 RGB:
/// - `inputs`  -> shape `[8, 10, 32, 32, 3]`
/// - `targets` -> shape `[8, 10, 32, 32, 3]`
#[derive(Debug)]
pub struct SequenceBatch {
    pub inputs: Tensor,
    pub targets: Tensor,
}

impl SequenceBatch {
    /// Stacks the windows of `samples` along a new batch dimension and scales
    /// the 8-bit pixels to `[0, 1]`. All samples must share window lengths
    /// and frame layout.
    pub fn collate(samples: &[WindowSample]) -> Result<Self> {
        ensure!(!samples.is_empty(), "Cannot collate an empty batch");
        let inputs = stack_windows(samples.iter().map(|s| s.inputs.as_slice()))
            .context("Failed to stack input windows")?;
        let targets = stack_windows(samples.iter().map(|s| s.targets.as_slice()))
            .context("Failed to stack target windows")?;
        Ok(Self { inputs, targets })
    }

    /// Returns the number of samples in the batch.
    pub fn batch_size(&self) -> i64 {
        self.inputs.size()[0]
    }

    /// Transfers both tensors to the target device (CPU/GPU)
    pub fn to_device(&self, device: Device) -> Self {
        Self {
            inputs: self.inputs.to_device(device),
            targets: self.targets.to_device(device),
        }
    }
}

fn stack_windows<'a>(windows: impl ExactSizeIterator<Item = &'a [DynamicImage]>) -> Result<Tensor> {
    let batch_size = windows.len();
    let mut shape: Option<[i64; 4]> = None;
    let mut bytes = Vec::new();

    for (b, window) in windows.enumerate() {
        ensure!(!window.is_empty(), "Sample {} has an empty window", b);
        for frame in window {
            let (width, height) = frame.dimensions();
            let frame_shape = [
                window.len() as i64,
                height as i64,
                width as i64,
                frame.color().channel_count() as i64,
            ];
            let expected = *shape.get_or_insert(frame_shape);
            ensure!(
                expected == frame_shape,
                "Sample {} has window shape {:?}, expected {:?}",
                b,
                frame_shape,
                expected
            );
            bytes.extend_from_slice(frame.as_bytes());
        }
    }

    let [t, h, w, c] = shape.context("Batch holds no frames")?;
    Tensor::from_slice(&bytes)
        .reshape(&[batch_size as i64, t, h, w, c])
        .to_kind(Kind::Float)
        .f_div_scalar(255.0)
        .context("Failed to normalize batch values")
}

#[cfg(test)]
mod minibatch_test {
    use super::*;
    use crate::transforms::vision::CropSpec;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn rgb_window(len: usize, value: u8) -> Vec<DynamicImage> {
        vec![DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([value, 0, 255]))); len]
    }

    fn sample(inputs: Vec<DynamicImage>, targets: Vec<DynamicImage>) -> WindowSample {
        WindowSample {
            inputs,
            targets,
            crop: CropSpec::default(),
            exhausted: false,
        }
    }

    #[test]
    fn test_collate_shapes_and_range() -> Result<()> {
        let samples = vec![
            sample(rgb_window(2, 51), rgb_window(3, 51)),
            sample(rgb_window(2, 102), rgb_window(3, 102)),
        ];
        let batch = SequenceBatch::collate(&samples)?;

        assert_eq!(batch.batch_size(), 2);
        assert_eq!(batch.inputs.size(), &[2, 2, 3, 4, 3]);
        assert_eq!(batch.targets.size(), &[2, 3, 3, 4, 3]);
        assert_eq!(batch.inputs.kind(), Kind::Float);

        let first = batch.inputs.double_value(&[0, 0, 0, 0, 0]);
        let second = batch.inputs.double_value(&[1, 1, 2, 3, 0]);
        assert!((first - 0.2).abs() < 1e-6);
        assert!((second - 0.4).abs() < 1e-6);
        assert!((batch.targets.max().double_value(&[]) - 1.0).abs() < 1e-6);
        assert!(batch.targets.min().double_value(&[]) >= 0.0);
        Ok(())
    }

    #[test]
    fn test_gray_frames_have_one_channel() -> Result<()> {
        let gray = vec![DynamicImage::ImageLuma8(GrayImage::from_pixel(5, 2, Luma([9]))); 2];
        let batch = SequenceBatch::collate(&[sample(gray.clone(), gray)])?;
        assert_eq!(batch.inputs.size(), &[1, 2, 2, 5, 1]);
        Ok(())
    }

    #[test]
    fn test_collate_shape_mismatch() {
        assert!(SequenceBatch::collate(&[]).is_err());

        let small = vec![DynamicImage::ImageRgb8(RgbImage::new(2, 2)); 2];
        let mismatched = vec![
            sample(rgb_window(2, 0), rgb_window(2, 0)),
            sample(small.clone(), small),
        ];
        assert!(SequenceBatch::collate(&mismatched).is_err());

        let uneven = vec![
            sample(rgb_window(2, 0), rgb_window(2, 0)),
            sample(rgb_window(3, 0), rgb_window(2, 0)),
        ];
        assert!(SequenceBatch::collate(&uneven).is_err());
    }

    #[test]
    fn test_batch_to_device() -> Result<()> {
        let batch = SequenceBatch::collate(&[sample(rgb_window(1, 0), rgb_window(1, 0))])?;
        let target_device = Device::cuda_if_available();
        let moved = batch.to_device(target_device);
        assert_eq!(moved.inputs.device(), target_device);
        assert_eq!(moved.targets.device(), target_device);
        assert_eq!(batch.inputs.device(), Device::Cpu);
        Ok(())
    }
}
