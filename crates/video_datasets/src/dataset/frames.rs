use super::{finish_batch, Dataset, WindowShape};
use crate::archive::{ArchiveExtractor, PreExtracted};
use crate::config::SequenceDatasetConfig;
use crate::minibatch::SequenceBatch;
use crate::readers::DatasetCatalog;
use crate::sequence::SequenceSampler;
use crate::transforms::vision::{
    EnsureDepth, EnsureSize, FrameDepth, LoadFrame, MotionFilter, SpatialTransform,
};
use crate::transforms::{Chain, Transform};
use anyhow::{ensure, Context, Result};
use image::{DynamicImage, GenericImageView};
use rand::{rngs::StdRng, SeedableRng};
use std::path::Path;

/// Frame file extensions picked up during discovery.
pub const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

pub const MS_PACMAN_ARCHIVE: &str = "Ms_Pacman.zip";
pub const MS_PACMAN_FRAME_HEIGHT: u32 = 210;
pub const MS_PACMAN_FRAME_WIDTH: u32 = 160;
/// First row of the score board at the bottom of the screen.
pub const MS_PACMAN_HUD_Y: u32 = 172;

/// Ms. Pac-Man splits. Validation is carved out of the `Train` recordings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsPacmanSplit {
    Train,
    Valid,
    Test,
}

impl MsPacmanSplit {
    pub fn subdir(self) -> &'static str {
        match self {
            MsPacmanSplit::Train | MsPacmanSplit::Valid => "Train",
            MsPacmanSplit::Test => "Test",
        }
    }

    /// Inclusive range of sequence directories, `None` for all of them.
    pub fn index_range(self) -> Option<(usize, usize)> {
        match self {
            MsPacmanSplit::Train => Some((0, 465)),
            MsPacmanSplit::Valid => Some((466, 516)),
            MsPacmanSplit::Test => None,
        }
    }

    /// Defaults of the preset: 10 input and 10 target frames, 256 repetitions,
    /// motion gating and random flips enabled.
    pub fn default_config(self) -> SequenceDatasetConfig {
        SequenceDatasetConfig::builder()
            .input_seq_length(10)
            .target_seq_length(10)
            .repetitions_per_epoch(256)
            .skip_less_movement(true)
            .random_flip(true)
            .build()
    }
}

type FrameLoader = Chain<Chain<LoadFrame, EnsureDepth, DynamicImage>, EnsureSize, DynamicImage>;

/// Dataset over directories of frame images, one directory per recorded episode.
///
/// Every batch draws its sequences uniformly with replacement, so there is no
/// epoch state and [`reset`](Dataset::reset) does nothing. The visible size is
/// `sequences * repetitions_per_epoch`: episodes are long and each draw only
/// uses a short random window and crop of them.
///
/// # Example
/// ```ignore
/// let config = SequenceDatasetConfig::builder().crop_size(32, 32).seed(1).build();
/// let mut train = FrameSequenceDataset::from_root("data/Ms_Pacman/Train", config)?;
/// let batch = train.get_batch(16)?;
/// assert_eq!(batch.inputs.size(), &[16, 5, 32, 32, 3]);
/// ```
pub struct FrameSequenceDataset {
    catalog: DatasetCatalog,
    config: SequenceDatasetConfig,
    sampler: SequenceSampler,
    loader: FrameLoader,
    rng: StdRng,
}

impl FrameSequenceDataset {
    /// Builds a dataset over an existing catalog of frames of `frame_size`
    /// (`(height, width)`). A decoded frame of any other size fails its batch.
    pub fn new(
        catalog: DatasetCatalog,
        frame_size: (u32, u32),
        config: SequenceDatasetConfig,
    ) -> Result<Self> {
        let (height, width) = frame_size;
        config.validate(height, width)?;
        ensure!(
            !config.double_with_flipped,
            "double_with_flipped needs a scheduler and is not available for frame directories"
        );
        if catalog.min_frame_count() < config.window_len() {
            log::warn!(
                "Shortest sequence has {} frames, but a window needs {}; sampling it will fail",
                catalog.min_frame_count(),
                config.window_len()
            );
        }

        let spatial = SpatialTransform::new(frame_size, config.crop_size, config.hud_y)?;
        let motion = config
            .skip_less_movement
            .then(|| MotionFilter::new(config.min_motion_per_frame));
        let sampler = SequenceSampler::new(
            config.input_seq_length,
            config.target_seq_length,
            spatial,
            motion,
            config.max_tries,
        )?
        .with_random_flip(config.random_flip);

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        Ok(Self {
            catalog,
            loader: LoadFrame::new()
                .then(EnsureDepth::new(config.depth))
                .then(EnsureSize::new(frame_size)),
            config,
            sampler,
            rng,
        })
    }

    /// Discovers the sequence directories under `root` (restricted to
    /// `config.index_range`) and reads the frame size from the first frame.
    pub fn from_root(root: impl AsRef<Path>, config: SequenceDatasetConfig) -> Result<Self> {
        let catalog = DatasetCatalog::discover(root, FRAME_EXTENSIONS, config.index_range)?;
        let probe = catalog
            .records()
            .iter()
            .find(|record| record.frame_count() > 0)
            .context("No frames found in any sequence directory")?;
        let first = probe.frame_paths(0..1)?.remove(0);
        let (width, height) = LoadFrame::new()
            .apply(first.clone())
            .with_context(|| format!("Failed to probe frame size from {}", first.display()))?
            .dimensions();
        Self::new(catalog, (height, width), config)
    }

    /// Ms. Pac-Man recordings in `data_dir`.
    ///
    /// `Ms_Pacman.zip` must be present and unpacked next to it. The split decides
    /// subdirectory and index range, and the HUD row is fixed by the game; all
    /// other settings come from `config` (see [`MsPacmanSplit::default_config`]).
    pub fn ms_pacman(
        data_dir: impl AsRef<Path>,
        split: MsPacmanSplit,
        mut config: SequenceDatasetConfig,
    ) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let root = PreExtracted::default().extract(&data_dir.join(MS_PACMAN_ARCHIVE), data_dir)?;

        config.index_range = split.index_range();
        config.hud_y = Some(MS_PACMAN_HUD_Y);
        let catalog =
            DatasetCatalog::discover(root.join(split.subdir()), &["png"], config.index_range)?;
        Self::new(
            catalog,
            (MS_PACMAN_FRAME_HEIGHT, MS_PACMAN_FRAME_WIDTH),
            config,
        )
    }

    pub fn config(&self) -> &SequenceDatasetConfig {
        &self.config
    }

    pub fn catalog(&self) -> &DatasetCatalog {
        &self.catalog
    }

    fn window_shape(&self, seq_len: usize) -> WindowShape {
        let (height, width) = self.sampler.spatial().output_size();
        [
            seq_len,
            height as usize,
            width as usize,
            self.depth().channels(),
        ]
    }

    fn depth(&self) -> FrameDepth {
        self.config.depth
    }
}

impl Dataset for FrameSequenceDataset {
    fn input_shape(&self) -> WindowShape {
        self.window_shape(self.config.input_seq_length)
    }

    fn target_shape(&self) -> WindowShape {
        self.window_shape(self.config.target_seq_length)
    }

    fn size(&self) -> usize {
        self.catalog.len() * self.config.repetitions_per_epoch
    }

    fn get_batch(&mut self, batch_size: usize) -> Result<SequenceBatch> {
        ensure!(batch_size > 0, "batch_size must be positive");
        let samples =
            self.sampler
                .sample_batch(&mut self.rng, &self.catalog, &self.loader, batch_size)?;
        finish_batch(&samples, batch_size)
    }

    fn reset(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_map_to_recorded_ranges() {
        assert_eq!(MsPacmanSplit::Train.subdir(), "Train");
        assert_eq!(MsPacmanSplit::Valid.subdir(), "Train");
        assert_eq!(MsPacmanSplit::Test.subdir(), "Test");
        assert_eq!(MsPacmanSplit::Train.index_range(), Some((0, 465)));
        assert_eq!(MsPacmanSplit::Valid.index_range(), Some((466, 516)));
        assert_eq!(MsPacmanSplit::Test.index_range(), None);
    }

    #[test]
    fn preset_defaults() {
        let config = MsPacmanSplit::Train.default_config();
        assert_eq!(config.window_len(), 20);
        assert_eq!(config.repetitions_per_epoch, 256);
        assert!(config.skip_less_movement && config.random_flip);
        assert!(!config.double_with_flipped);
    }

    #[test]
    fn missing_archive_fails_fast() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let result = FrameSequenceDataset::ms_pacman(
            dir.path(),
            MsPacmanSplit::Test,
            MsPacmanSplit::Test.default_config(),
        );
        assert!(result.is_err());
        Ok(())
    }
}
