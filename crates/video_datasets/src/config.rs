//! src/config.rs
//!
//! Configuration for sequence datasets.
//!
//! `SequenceDatasetConfig` stores the parameters that control how input/target
//! windows are sampled and augmented. It can be built in code or loaded from a
//! TOML/JSON file.
//!
//! Example:
//! ```ignore
//! let config = SequenceDatasetConfig::builder()
//!     .input_seq_length(8)
//!     .target_seq_length(8)
//!     .crop_size(32, 32)
//!     .repetitions_per_epoch(16)
//!     .seed(7)
//!     .build();
//! ```
//!
//! ```toml
//! input_seq_length = 8
//! target_seq_length = 8
//! crop_size = [32, 32]
//! depth = "gray"
//! ```

use crate::transforms::vision::{FrameDepth, MIN_L2_DIFF_PER_FRAME};
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Retry budget of the crop search.
pub const MAX_TRIES: usize = 100;

/// Configuration for a sequence dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceDatasetConfig {
    /// Frames per input window
    pub input_seq_length: usize,
    /// Frames per target window, directly following the inputs
    pub target_seq_length: usize,
    /// `(height, width)` of the random crop; `None` keeps the full frame
    pub crop_size: Option<(u32, u32)>,
    /// Virtual multiplier of the dataset size
    pub repetitions_per_epoch: usize,
    /// Reject crops whose input window shows too little motion
    pub skip_less_movement: bool,
    /// Mirror each sample with probability 1/2
    pub random_flip: bool,
    /// Serve every item a second time, horizontally flipped
    pub double_with_flipped: bool,
    /// Inclusive `(start, end)` range of sequence directories to use
    pub index_range: Option<(usize, usize)>,
    /// Channel depth of the returned frames
    pub depth: FrameDepth,
    /// First row of the HUD strip; crops reaching it are never flipped
    pub hud_y: Option<u32>,
    /// Upper bound of crop attempts per sample
    pub max_tries: usize,
    /// Motion threshold per frame, on the [-1, 1] pixel scale
    pub min_motion_per_frame: f64,
    /// Seed of the dataset's random generator (drawn from the OS if absent)
    pub seed: Option<u64>,
}

impl Default for SequenceDatasetConfig {
    fn default() -> Self {
        Self {
            input_seq_length: 5,
            target_seq_length: 5,
            crop_size: None,
            repetitions_per_epoch: 1,
            skip_less_movement: true,
            random_flip: false,
            double_with_flipped: false,
            index_range: None,
            depth: FrameDepth::Rgb,
            hud_y: None,
            max_tries: MAX_TRIES,
            min_motion_per_frame: MIN_L2_DIFF_PER_FRAME,
            seed: None,
        }
    }
}

impl SequenceDatasetConfig {
    pub fn builder() -> SequenceDatasetConfigBuilder {
        SequenceDatasetConfigBuilder::default()
    }

    /// Loads a configuration from a `.json` or `.toml` file (chosen by extension,
    /// TOML otherwise). Missing fields take their default values.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON config: {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Invalid TOML config: {}", path.display()))
        }
    }

    /// Total frames needed per sample.
    pub fn window_len(&self) -> usize {
        self.input_seq_length + self.target_seq_length
    }

    /// Checks the configuration against the source frame size.
    pub fn validate(&self, frame_height: u32, frame_width: u32) -> Result<()> {
        ensure!(
            self.input_seq_length > 0 && self.target_seq_length > 0,
            "Sequence lengths must be positive (input={}, target={})",
            self.input_seq_length,
            self.target_seq_length
        );
        ensure!(
            self.repetitions_per_epoch > 0,
            "repetitions_per_epoch must be positive"
        );
        ensure!(self.max_tries > 0, "max_tries must be positive");
        ensure!(
            self.min_motion_per_frame.is_finite() && self.min_motion_per_frame >= 0.0,
            "min_motion_per_frame must be a non-negative number, but got {}",
            self.min_motion_per_frame
        );
        if let Some((crop_h, crop_w)) = self.crop_size {
            ensure!(
                crop_h > 0 && crop_w > 0,
                "Crop size must be positive (got {}x{})",
                crop_h,
                crop_w
            );
            ensure!(
                crop_h < frame_height && crop_w < frame_width,
                "Frame size {}x{} has to be larger than the crop size {}x{}",
                frame_height,
                frame_width,
                crop_h,
                crop_w
            );
        }
        if let Some((start, end)) = self.index_range {
            ensure!(
                start <= end,
                "Invalid index range ({}, {}): start must not exceed end",
                start,
                end
            );
        }
        Ok(())
    }
}

/// Builder for SequenceDatasetConfig with method chaining
#[derive(Default)]
pub struct SequenceDatasetConfigBuilder {
    config: SequenceDatasetConfig,
}

impl SequenceDatasetConfigBuilder {
    pub fn input_seq_length(mut self, length: usize) -> Self {
        self.config.input_seq_length = length;
        self
    }

    pub fn target_seq_length(mut self, length: usize) -> Self {
        self.config.target_seq_length = length;
        self
    }

    /// Set the random crop size as `(height, width)`.
    pub fn crop_size(mut self, height: u32, width: u32) -> Self {
        self.config.crop_size = Some((height, width));
        self
    }

    pub fn repetitions_per_epoch(mut self, repetitions: usize) -> Self {
        self.config.repetitions_per_epoch = repetitions;
        self
    }

    pub fn skip_less_movement(mut self, skip: bool) -> Self {
        self.config.skip_less_movement = skip;
        self
    }

    pub fn random_flip(mut self, flip: bool) -> Self {
        self.config.random_flip = flip;
        self
    }

    pub fn double_with_flipped(mut self, double: bool) -> Self {
        self.config.double_with_flipped = double;
        self
    }

    /// Restrict discovery to the sequence directories `start..=end`.
    pub fn index_range(mut self, start: usize, end: usize) -> Self {
        self.config.index_range = Some((start, end));
        self
    }

    pub fn depth(mut self, depth: FrameDepth) -> Self {
        self.config.depth = depth;
        self
    }

    pub fn hud_y(mut self, hud_y: u32) -> Self {
        self.config.hud_y = Some(hud_y);
        self
    }

    pub fn max_tries(mut self, tries: usize) -> Self {
        self.config.max_tries = tries;
        self
    }

    pub fn min_motion_per_frame(mut self, threshold: f64) -> Self {
        self.config.min_motion_per_frame = threshold;
        self
    }

    /// Set the seed of the dataset's random generator.
    ///
    /// When set, this seed controls:
    /// - sequence choice, start indices and crop offsets
    /// - the permutation of scheduler-driven datasets
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn build(self) -> SequenceDatasetConfig {
        self.config
    }
}
