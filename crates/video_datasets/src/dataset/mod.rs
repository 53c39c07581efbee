//! src/dataset/mod.rs
//!
//! Video-prediction datasets.
//!
//! ```text
//! dataset/
//! ├── frames.rs  → FrameSequenceDataset: directories of frame images (Ms. Pac-Man)
//! └── clips.rs   → ClipDataset: serialized fixed-length clips (UCF-101 evaluation)
//! ```
//!
//! Both variants are configured with a
//! [`SequenceDatasetConfig`](crate::config::SequenceDatasetConfig) and hand out
//! [`SequenceBatch`]es of normalized `[B, T, H, W, C]` tensors.

pub mod clips;
pub mod frames;

pub use clips::{ClipDataset, UcfSplit};
pub use frames::{FrameSequenceDataset, MsPacmanSplit};

use crate::minibatch::SequenceBatch;
use crate::sequence::WindowSample;
use anyhow::Result;

/// Shape of one sample window: `[seq_len, height, width, channels]`.
pub type WindowShape = [usize; 4];

/// The capability training code relies on.
///
/// `size` is the externally visible number of samples per epoch, which may be
/// inflated beyond the stored sequences by repetition and flip doubling.
pub trait Dataset {
    fn input_shape(&self) -> WindowShape;

    fn target_shape(&self) -> WindowShape;

    fn size(&self) -> usize;

    /// Returns `(inputs, targets)` with a leading dimension of exactly `batch_size`.
    fn get_batch(&mut self, batch_size: usize) -> Result<SequenceBatch>;

    /// Starts a new epoch.
    fn reset(&mut self) -> Result<()>;
}

/// Collates `samples` and checks the batch invariant.
///
/// # Panics
/// If the batch does not hold exactly `batch_size` samples.
pub(crate) fn finish_batch(samples: &[WindowSample], batch_size: usize) -> Result<SequenceBatch> {
    let batch = SequenceBatch::collate(samples)?;
    assert_eq!(
        batch.batch_size(),
        batch_size as i64,
        "batch leading dimension does not match the requested batch size"
    );
    Ok(batch)
}
