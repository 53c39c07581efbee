use crate::readers::{DatasetCatalog, SequenceRecord};
use crate::transforms::vision::{CropSpec, MotionFilter, SpatialTransform};
use crate::transforms::Transform;
use anyhow::{bail, ensure, Context, Result};
use image::DynamicImage;
use rand::Rng;
use std::path::PathBuf;

/// Result of the bounded crop search.
///
/// `ExhaustedFallback` carries the candidate of the final attempt, which is taken
/// without a motion test once every earlier attempt was rejected.
#[derive(Debug, Clone)]
pub enum CropOutcome {
    Accepted(CroppedWindow),
    ExhaustedFallback(CroppedWindow),
}

impl CropOutcome {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, CropOutcome::ExhaustedFallback(_))
    }

    pub fn into_window(self) -> CroppedWindow {
        match self {
            CropOutcome::Accepted(window) | CropOutcome::ExhaustedFallback(window) => window,
        }
    }
}

/// A crop decision together with the input frames it was applied to.
#[derive(Debug, Clone)]
pub struct CroppedWindow {
    pub spec: CropSpec,
    pub frames: Vec<DynamicImage>,
}

/// One batch item: transformed input and target windows.
#[derive(Debug, Clone)]
pub struct WindowSample {
    pub inputs: Vec<DynamicImage>,
    pub targets: Vec<DynamicImage>,
    pub crop: CropSpec,
    /// Whether the crop search ran out of attempts.
    pub exhausted: bool,
}

// ============================================================================
// SequenceSampler
// ============================================================================

/// Samples temporally coherent input/target windows and searches a crop with
/// enough motion.
///
/// Per item:
/// 1. pick a start index so that the whole window fits the stored sequence,
/// 2. decode the input frames once,
/// 3. draw crop candidates (at most `max_tries`) until the cropped inputs pass
///    the motion filter; the last attempt is taken unconditionally,
/// 4. decode the target frames only now and apply the same crop and flip.
///
/// Without a crop there is nothing to retry: the single candidate covers the
/// full frame and is accepted as is.
#[derive(Debug, Clone)]
pub struct SequenceSampler {
    input_len: usize,
    target_len: usize,
    spatial: SpatialTransform,
    motion: Option<MotionFilter>,
    max_tries: usize,
    random_flip: bool,
}

impl SequenceSampler {
    /// `motion` is `None` when motion gating is disabled.
    pub fn new(
        input_len: usize,
        target_len: usize,
        spatial: SpatialTransform,
        motion: Option<MotionFilter>,
        max_tries: usize,
    ) -> Result<Self> {
        ensure!(
            input_len > 0 && target_len > 0,
            "Input and target windows must be non-empty (got {} and {})",
            input_len,
            target_len
        );
        ensure!(max_tries > 0, "max_tries must be positive");
        Ok(Self {
            input_len,
            target_len,
            spatial,
            motion,
            max_tries,
            random_flip: false,
        })
    }

    /// Enables a per-sample coin flip for horizontal mirroring.
    pub fn with_random_flip(mut self, random_flip: bool) -> Self {
        self.random_flip = random_flip;
        self
    }

    pub fn window_len(&self) -> usize {
        self.input_len + self.target_len
    }

    pub fn spatial(&self) -> &SpatialTransform {
        &self.spatial
    }

    /// Draws `batch_size` items from `catalog`, choosing each source sequence
    /// uniformly with replacement.
    pub fn sample_batch<R, L>(
        &self,
        rng: &mut R,
        catalog: &DatasetCatalog,
        loader: &L,
        batch_size: usize,
    ) -> Result<Vec<WindowSample>>
    where
        R: Rng + ?Sized,
        L: Transform<PathBuf, DynamicImage>,
    {
        ensure!(!catalog.is_empty(), "Cannot sample from an empty catalog");
        let picks: Vec<usize> = (0..batch_size)
            .map(|_| rng.random_range(0..catalog.len()))
            .collect();

        picks
            .into_iter()
            .map(|i| match catalog.get(i) {
                Some(record) => self.sample_record(rng, record, loader),
                None => bail!("Catalog index {} out of range", i),
            })
            .collect()
    }

    /// Samples one window from a frame directory.
    pub fn sample_record<R, L>(
        &self,
        rng: &mut R,
        record: &SequenceRecord,
        loader: &L,
    ) -> Result<WindowSample>
    where
        R: Rng + ?Sized,
        L: Transform<PathBuf, DynamicImage>,
    {
        let start = self.pick_start(rng, record.frame_count())?;
        let flip = self.random_flip && rng.random::<f64>() > 0.5;

        let inputs = load_all(loader, record.frame_paths(start..start + self.input_len)?)?;
        let target_range = start + self.input_len..start + self.window_len();
        self.crop_window(rng, &inputs, flip, || {
            load_all(loader, record.frame_paths(target_range)?)
        })
    }

    /// Samples one window from an in-memory clip. `flip` is decided by the caller.
    pub fn sample_clip<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        clip: &[DynamicImage],
        flip: bool,
    ) -> Result<WindowSample> {
        let start = self.pick_start(rng, clip.len())?;
        let (inputs, targets) = clip[start..start + self.window_len()].split_at(self.input_len);
        self.crop_window(rng, inputs, flip, || Ok(targets.to_vec()))
    }

    /// Uniform start index such that `start + window_len <= frame_count`.
    pub fn pick_start<R: Rng + ?Sized>(&self, rng: &mut R, frame_count: usize) -> Result<usize> {
        let window = self.window_len();
        if frame_count < window {
            bail!(
                "Sequence has {} frames, but input + target windows need {}",
                frame_count,
                window
            );
        }
        Ok(rng.random_range(0..=frame_count - window))
    }

    /// Runs the bounded crop search on `inputs`.
    pub fn select_crop<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        inputs: &[DynamicImage],
        flip: bool,
    ) -> CropOutcome {
        let motion = match &self.motion {
            Some(motion) if self.spatial.crops() => motion,
            _ => return CropOutcome::Accepted(self.candidate(rng, inputs, flip)),
        };

        for _ in 1..self.max_tries {
            let candidate = self.candidate(rng, inputs, flip);
            if motion.has_enough_motion(&candidate.frames) {
                return CropOutcome::Accepted(candidate);
            }
        }
        log::debug!(
            "No crop with enough motion after {} attempts, keeping the last one",
            self.max_tries
        );
        CropOutcome::ExhaustedFallback(self.candidate(rng, inputs, flip))
    }

    fn candidate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        inputs: &[DynamicImage],
        flip: bool,
    ) -> CroppedWindow {
        let spec = self.spatial.draw(rng, flip);
        let frames = self.spatial.apply(&spec, inputs);
        CroppedWindow { spec, frames }
    }

    fn crop_window<R, F>(
        &self,
        rng: &mut R,
        inputs: &[DynamicImage],
        flip: bool,
        load_targets: F,
    ) -> Result<WindowSample>
    where
        R: Rng + ?Sized,
        F: FnOnce() -> Result<Vec<DynamicImage>>,
    {
        let outcome = self.select_crop(rng, inputs, flip);
        let exhausted = outcome.is_exhausted();
        let CroppedWindow { spec, frames } = outcome.into_window();

        let targets = self.spatial.apply(&spec, &load_targets()?);
        Ok(WindowSample {
            inputs: frames,
            targets,
            crop: spec,
            exhausted,
        })
    }
}

fn load_all<L>(loader: &L, paths: Vec<PathBuf>) -> Result<Vec<DynamicImage>>
where
    L: Transform<PathBuf, DynamicImage>,
{
    paths
        .into_iter()
        .map(|path| {
            let context = format!("Failed to load frame {}", path.display());
            loader.apply(path).context(context)
        })
        .collect()
}
