use crate::transforms::vision::FrameDepth;
use crate::transforms::Transform;
use anyhow::{anyhow, ensure, Context, Result};
use image::{DynamicImage, GrayImage, RgbImage};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Byte layout of a serialized clip: `sequence_length` raw frames of
/// `height x width x channels` bytes each, stored back to back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipLayout {
    pub sequence_length: usize,
    pub height: u32,
    pub width: u32,
    pub depth: FrameDepth,
}

impl ClipLayout {
    pub fn frame_bytes(&self) -> usize {
        self.height as usize * self.width as usize * self.depth.channels()
    }

    pub fn clip_bytes(&self) -> usize {
        self.frame_bytes() * self.sequence_length
    }
}

// ============================================================================
// SerializedClipReader
// ============================================================================

/// Reads a whole serialized clip and splits it into frames.
///
/// A file whose size does not match the layout exactly is rejected; such a file
/// was written with a different scale factor or depth and cannot be reinterpreted.
#[derive(Debug, Clone, Copy)]
pub struct SerializedClipReader {
    layout: ClipLayout,
}

impl SerializedClipReader {
    pub fn new(layout: ClipLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ClipLayout {
        &self.layout
    }
}

impl Transform<PathBuf, Vec<DynamicImage>> for SerializedClipReader {
    fn apply(&self, path: PathBuf) -> Result<Vec<DynamicImage>> {
        let bytes = fs::read(&path)
            .with_context(|| format!("Failed to read serialized clip: {}", path.display()))?;
        ensure!(
            bytes.len() == self.layout.clip_bytes(),
            "Serialized clip {} has {} bytes, expected {} ({} frames of {}x{}x{})",
            path.display(),
            bytes.len(),
            self.layout.clip_bytes(),
            self.layout.sequence_length,
            self.layout.height,
            self.layout.width,
            self.layout.depth.channels()
        );

        let ClipLayout {
            height,
            width,
            depth,
            ..
        } = self.layout;
        bytes
            .chunks_exact(self.layout.frame_bytes())
            .map(|raw| {
                let raw = raw.to_vec();
                let frame = match depth {
                    FrameDepth::Rgb => {
                        RgbImage::from_raw(width, height, raw).map(DynamicImage::ImageRgb8)
                    }
                    FrameDepth::Gray => {
                        GrayImage::from_raw(width, height, raw).map(DynamicImage::ImageLuma8)
                    }
                };
                frame.ok_or_else(|| anyhow!("Frame buffer does not fit {}x{}", width, height))
            })
            .collect()
    }
}

/// Lists the serialized clips in `dir` with the given extension, sorted by name.
///
/// When `allowed_stems` is set, only clips whose file stem is in the set are kept
/// (the stems of a split list, see [`read_eval_splits`](super::read_eval_splits)).
pub fn list_clips(
    dir: impl AsRef<Path>,
    extension: &str,
    allowed_stems: Option<&HashSet<String>>,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    ensure!(
        dir.is_dir(),
        "Serialized clip directory not found: {}",
        dir.display()
    );

    let mut clips = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| anyhow!("Failed to read directory entry: {}", e))?;
        let path = entry.path();
        let extension_matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if !entry.file_type().is_file() || !extension_matches {
            continue;
        }
        let in_split = match (allowed_stems, path.file_stem().and_then(|s| s.to_str())) {
            (Some(stems), Some(stem)) => stems.contains(stem),
            (Some(_), None) => false,
            (None, _) => true,
        };
        if in_split {
            clips.push(entry.into_path());
        }
    }
    ensure!(
        !clips.is_empty(),
        "No .{} clips found in {}",
        extension,
        dir.display()
    );
    Ok(clips)
}
