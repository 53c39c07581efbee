use super::{finish_batch, Dataset, WindowShape};
use crate::archive::{ArchiveExtractor, PreExtracted};
use crate::config::SequenceDatasetConfig;
use crate::minibatch::SequenceBatch;
use crate::readers::frame_dir::select_index_range;
use crate::readers::{
    list_clips, read_eval_splits, split_stems, ClipLayout, SerializedClipReader,
};
use crate::sampler::RandomSampler;
use crate::scheduler::CircularIndexScheduler;
use crate::sequence::SequenceSampler;
use crate::transforms::vision::{FrameDepth, MotionFilter, SpatialTransform};
use crate::transforms::Transform;
use anyhow::{ensure, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// File extension of serialized clips.
pub const CLIP_EXTENSION: &str = "seq";

pub const UCF_VIDEO_ARCHIVE: &str = "UCF101.rar";
pub const UCF_SPLITS_ARCHIVE: &str = "UCF101TrainTestSplits-RecognitionTask.zip";
pub const UCF_FRAME_HEIGHT: u32 = 240;
pub const UCF_FRAME_WIDTH: u32 = 320;
pub const UCF_SERIALIZED_SEQUENCE_LENGTH: usize = 30;

/// UCF-101 evaluation splits, both drawn from the test list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UcfSplit {
    Valid,
    Test,
}

impl UcfSplit {
    pub fn subdir(self) -> &'static str {
        match self {
            UcfSplit::Valid => "valid",
            UcfSplit::Test => "test",
        }
    }

    /// 5 input and 5 target frames, motion gating on, and 4 (valid) or
    /// 8 (test) repetitions.
    pub fn default_config(self) -> SequenceDatasetConfig {
        let repetitions = match self {
            UcfSplit::Valid => 4,
            UcfSplit::Test => 8,
        };
        SequenceDatasetConfig::builder()
            .input_seq_length(5)
            .target_seq_length(5)
            .repetitions_per_epoch(repetitions)
            .skip_less_movement(true)
            .build()
    }
}

/// Layout of UCF-101 clips serialized at `image_scale_factor` (in `(0, 1]`).
/// Scaled sizes are truncated, e.g. `0.5` gives `120 x 160`.
pub fn ucf_layout(image_scale_factor: f64, gray_scale: bool) -> Result<ClipLayout> {
    ensure!(
        image_scale_factor > 0.0 && image_scale_factor <= 1.0,
        "image_scale_factor must be in (0, 1], but got {}",
        image_scale_factor
    );
    Ok(ClipLayout {
        sequence_length: UCF_SERIALIZED_SEQUENCE_LENGTH,
        height: (UCF_FRAME_HEIGHT as f64 * image_scale_factor) as u32,
        width: (UCF_FRAME_WIDTH as f64 * image_scale_factor) as u32,
        depth: if gray_scale {
            FrameDepth::Gray
        } else {
            FrameDepth::Rgb
        },
    })
}

/// Scheduler-driven evaluation dataset over serialized clips.
///
/// Every epoch visits each clip `repetitions_per_epoch` times (twice as often with
/// `double_with_flipped`, once per orientation) in a shuffled order. Per item a
/// random window of the clip is taken and cropped; the crop search uses the plain
/// motion threshold without the static-tail rejection.
///
/// # Example
/// ```ignore
/// let layout = ucf_layout(0.5, false)?;
/// let config = UcfSplit::Valid.default_config();
/// let mut valid = ClipDataset::ucf101("data", UcfSplit::Valid, layout, config)?;
/// for _ in 0..valid.size() / 8 {
///     let batch = valid.get_batch(8)?;
/// }
/// valid.reset()?;
/// ```
pub struct ClipDataset {
    clips: Vec<PathBuf>,
    reader: SerializedClipReader,
    config: SequenceDatasetConfig,
    sampler: SequenceSampler,
    scheduler: CircularIndexScheduler<RandomSampler>,
    rng: StdRng,
}

impl ClipDataset {
    /// `clips` are restricted to `config.index_range` (inclusive, over the given
    /// order) before anything else.
    pub fn new(
        clips: Vec<PathBuf>,
        layout: ClipLayout,
        config: SequenceDatasetConfig,
    ) -> Result<Self> {
        ensure!(!clips.is_empty(), "Clip dataset needs at least one clip");
        config.validate(layout.height, layout.width)?;
        let clips = select_index_range(clips, config.index_range)?;
        ensure!(
            layout.depth == config.depth,
            "Clips are stored as {:?}, but the configuration asks for {:?}",
            layout.depth,
            config.depth
        );
        ensure!(
            !config.random_flip,
            "random_flip is not available for clips, use double_with_flipped"
        );
        ensure!(
            config.window_len() <= layout.sequence_length,
            "Input + target windows ({}) exceed the serialized sequence length ({})",
            config.window_len(),
            layout.sequence_length
        );

        let spatial =
            SpatialTransform::new((layout.height, layout.width), config.crop_size, config.hud_y)?;
        let motion = config.skip_less_movement.then(|| {
            MotionFilter::new(config.min_motion_per_frame).without_static_tail_check()
        });
        let sampler = SequenceSampler::new(
            config.input_seq_length,
            config.target_seq_length,
            spatial,
            motion,
            config.max_tries,
        )?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let permutation = RandomSampler::new(clips.len(), rng.random())?;
        let scheduler = CircularIndexScheduler::new(
            permutation,
            clips.len(),
            config.repetitions_per_epoch,
            config.double_with_flipped,
        )?;

        Ok(Self {
            clips,
            reader: SerializedClipReader::new(layout),
            config,
            sampler,
            scheduler,
            rng,
        })
    }

    /// Collects the `.seq` clips in `dir`, optionally restricted to the given
    /// file stems.
    pub fn from_dir(
        dir: impl AsRef<Path>,
        allowed_stems: Option<&HashSet<String>>,
        layout: ClipLayout,
        config: SequenceDatasetConfig,
    ) -> Result<Self> {
        let clips = list_clips(dir, CLIP_EXTENSION, allowed_stems)?;
        log::info!("Found {} serialized clips", clips.len());
        Self::new(clips, layout, config)
    }

    /// UCF-101 evaluation clips in `data_dir`.
    ///
    /// Both archives must be present and unpacked (`UCF-101/`, `ucfTrainTestlist/`),
    /// and the clips serialized with `layout` under `UCF-101/<split>/`. Only clips
    /// listed for the split are used.
    pub fn ucf101(
        data_dir: impl AsRef<Path>,
        split: UcfSplit,
        layout: ClipLayout,
        mut config: SequenceDatasetConfig,
    ) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let dataset_path =
            PreExtracted::named("UCF-101").extract(&data_dir.join(UCF_VIDEO_ARCHIVE), data_dir)?;
        let splits_path = PreExtracted::named("ucfTrainTestlist")
            .extract(&data_dir.join(UCF_SPLITS_ARCHIVE), data_dir)?;

        let (valid, test) = read_eval_splits(&splits_path)?;
        let stems = split_stems(match split {
            UcfSplit::Valid => valid.as_slice(),
            UcfSplit::Test => test.as_slice(),
        });
        config.depth = layout.depth;
        Self::from_dir(dataset_path.join(split.subdir()), Some(&stems), layout, config)
    }

    pub fn config(&self) -> &SequenceDatasetConfig {
        &self.config
    }

    /// Number of distinct clips.
    pub fn true_size(&self) -> usize {
        self.clips.len()
    }

    pub fn scheduler(&self) -> &CircularIndexScheduler<RandomSampler> {
        &self.scheduler
    }

    fn window_shape(&self, seq_len: usize) -> WindowShape {
        let (height, width) = self.sampler.spatial().output_size();
        [
            seq_len,
            height as usize,
            width as usize,
            self.reader.layout().depth.channels(),
        ]
    }
}

impl Dataset for ClipDataset {
    fn input_shape(&self) -> WindowShape {
        self.window_shape(self.config.input_seq_length)
    }

    fn target_shape(&self) -> WindowShape {
        self.window_shape(self.config.target_seq_length)
    }

    fn size(&self) -> usize {
        self.scheduler.size()
    }

    fn get_batch(&mut self, batch_size: usize) -> Result<SequenceBatch> {
        let slots = self.scheduler.next_window(batch_size)?;
        let samples = slots
            .into_iter()
            .map(|slot| {
                let clip = self.reader.apply(self.clips[slot.index].clone())?;
                self.sampler.sample_clip(&mut self.rng, &clip, slot.flip)
            })
            .collect::<Result<Vec<_>>>()?;
        finish_batch(&samples, batch_size)
    }

    fn reset(&mut self) -> Result<()> {
        self.scheduler.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_truncates_scaled_size() -> Result<()> {
        let half = ucf_layout(0.5, false)?;
        assert_eq!((half.height, half.width), (120, 160));
        assert_eq!(half.depth, FrameDepth::Rgb);

        let odd = ucf_layout(0.33, true)?;
        assert_eq!((odd.height, odd.width), (79, 105));
        assert_eq!(odd.depth.channels(), 1);
        assert_eq!(odd.sequence_length, 30);

        assert!(ucf_layout(0.0, false).is_err());
        assert!(ucf_layout(1.5, false).is_err());
        Ok(())
    }

    #[test]
    fn split_presets() {
        assert_eq!(UcfSplit::Valid.default_config().repetitions_per_epoch, 4);
        assert_eq!(UcfSplit::Test.default_config().repetitions_per_epoch, 8);
        assert_eq!(UcfSplit::Test.default_config().window_len(), 10);
    }

    #[test]
    fn rejects_inconsistent_configuration() -> Result<()> {
        let layout = ClipLayout {
            sequence_length: 6,
            height: 8,
            width: 8,
            depth: FrameDepth::Rgb,
        };
        let clips = vec![PathBuf::from("a.seq")];

        let too_long = SequenceDatasetConfig::builder()
            .input_seq_length(4)
            .target_seq_length(4)
            .build();
        assert!(ClipDataset::new(clips.clone(), layout, too_long).is_err());

        let gray = SequenceDatasetConfig::builder()
            .input_seq_length(2)
            .target_seq_length(2)
            .depth(FrameDepth::Gray)
            .build();
        assert!(ClipDataset::new(clips.clone(), layout, gray).is_err());

        let ok = SequenceDatasetConfig::builder()
            .input_seq_length(2)
            .target_seq_length(2)
            .build();
        assert!(ClipDataset::new(vec![], layout, ok.clone()).is_err());
        assert!(ClipDataset::new(clips, layout, ok).is_ok());
        Ok(())
    }

    #[test]
    fn index_range_restricts_clips() -> Result<()> {
        let layout = ClipLayout {
            sequence_length: 6,
            height: 8,
            width: 8,
            depth: FrameDepth::Rgb,
        };
        let clips: Vec<_> = (0..5).map(|i| PathBuf::from(format!("v_{}.seq", i))).collect();
        let config = SequenceDatasetConfig::builder()
            .input_seq_length(2)
            .target_seq_length(2)
            .repetitions_per_epoch(3)
            .index_range(1, 3)
            .seed(0)
            .build();

        let dataset = ClipDataset::new(clips.clone(), layout, config.clone())?;
        assert_eq!(dataset.true_size(), 3);
        assert_eq!(dataset.size(), 9);
        assert_eq!(dataset.clips, clips[1..4].to_vec());

        let mut beyond = config;
        beyond.index_range = Some((5, 9));
        assert!(ClipDataset::new(clips, layout, beyond).is_err());
        Ok(())
    }
}
