use crate::transforms::Transform;
use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, ImageReader, RgbImage};
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use turbojpeg::{Decompressor, Image, PixelFormat};

// ============================================================================
// LoadFrame
// ============================================================================

/// Reads a single video frame from disk.
///
/// This is the frame store accessor used by every sequence dataset: the sampler hands
/// it the path of one frame and gets back the decoded image. Channel depth is left as
/// stored on disk; chain with [`EnsureDepth`](super::EnsureDepth) to pin it.
///
/// # Input/Output
/// - **Input**: `PathBuf` - path to a frame image (`0001.png`, `frame_17.jpg`, ...)
/// - **Output**: `DynamicImage` - decoded 8-bit frame
///
/// # Example
/// ```ignore
/// let loader = LoadFrame::new().then(EnsureDepth::rgb());
/// let frame = loader.apply(PathBuf::from("Train/0003/0120.png"))?;
/// ```
#[derive(Debug, Clone)]
pub struct LoadFrame {
    buffer_size: usize,
}

impl Default for LoadFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadFrame {
    /// Creates a frame loader with an 8KB read buffer.
    pub fn new() -> Self {
        Self { buffer_size: 8192 }
    }

    /// Decodes JPEG frames with TurboJPEG straight into an RGB buffer.
    fn load_jpeg_turbo(&self, path: &Path) -> Result<DynamicImage> {
        let mut file = File::open(path)
            .with_context(|| format!("Failed to open JPEG frame: {}", path.display()))?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read JPEG frame: {}", path.display()))?;

        let mut decompressor =
            Decompressor::new().with_context(|| "Failed to create TurboJPEG decompressor")?;
        let header = decompressor
            .read_header(&buffer)
            .with_context(|| format!("Failed to read JPEG header: {}", path.display()))?;

        let width = header.width;
        let height = header.height;
        let mut rgb_data = vec![0u8; width * height * 3];
        let output = Image {
            pixels: rgb_data.as_mut_slice(),
            width,
            height,
            format: PixelFormat::RGB,
            pitch: width * 3,
        };

        decompressor
            .decompress(&buffer, output)
            .with_context(|| format!("Failed to decompress JPEG frame: {}", path.display()))?;

        let rgb = RgbImage::from_raw(width as u32, height as u32, rgb_data)
            .ok_or_else(|| anyhow!("TurboJPEG output does not fit a {width}x{height} frame"))?;
        Ok(DynamicImage::ImageRgb8(rgb))
    }

    /// Decodes PNG and every other format the `image` crate understands.
    fn load_with_image(&self, path: &Path) -> Result<DynamicImage> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open frame: {}", path.display()))?;

        let file_size = file.metadata()?.len() as usize;
        let mut reader = BufReader::with_capacity(self.buffer_size, file);
        let mut buffer = Vec::with_capacity(file_size);
        reader
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read frame: {}", path.display()))?;

        ImageReader::new(Cursor::new(buffer))
            .with_guessed_format()?
            .decode()
            .with_context(|| format!("Failed to decode frame: {}", path.display()))
    }

    fn is_jpeg_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg"))
    }
}

impl Transform<PathBuf, DynamicImage> for LoadFrame {
    fn apply(&self, path: PathBuf) -> Result<DynamicImage> {
        if Self::is_jpeg_file(&path) {
            self.load_jpeg_turbo(&path).or_else(|turbo_error| {
                log::warn!(
                    "TurboJPEG failed for {}, falling back to image decoder: {}",
                    path.display(),
                    turbo_error
                );
                self.load_with_image(&path)
            })
        } else {
            self.load_with_image(&path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb};
    use tempfile::NamedTempFile;

    fn write_test_frame() -> Result<NamedTempFile> {
        let mut frame = RgbImage::new(4, 3);
        frame.put_pixel(0, 0, Rgb([255, 0, 0]));
        frame.put_pixel(3, 2, Rgb([0, 0, 255]));

        let temp_file = NamedTempFile::with_suffix(".png")?;
        frame.save(temp_file.path())?;
        Ok(temp_file)
    }

    #[test]
    fn test_load_png_frame() -> Result<()> {
        let temp_file = write_test_frame()?;

        let frame = LoadFrame::new().apply(temp_file.path().to_path_buf())?;
        assert_eq!(frame.dimensions(), (4, 3));

        let rgb = frame.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(rgb.get_pixel(3, 2), &Rgb([0, 0, 255]));
        Ok(())
    }

    #[test]
    fn test_missing_frame_is_an_error() {
        let result = LoadFrame::new().apply(PathBuf::from("does/not/exist.png"));
        assert!(result.is_err());

        let result = LoadFrame::new().apply(PathBuf::from("does/not/exist.jpg"));
        assert!(result.is_err());
    }
}
