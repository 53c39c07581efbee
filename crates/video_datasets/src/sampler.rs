use anyhow::{ensure, Result};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};

/// A `Sampler` defines the order in which the entries of a catalog are visited.
///
/// # Associated type
/// - `Item`: The handle yielded by the iterator. The schedulers in this crate
///   only use `usize` catalog indices.
///
/// # Method
/// - `iter(epoch)`: returns a sequential or shuffled order for that epoch.
///    - The `epoch` is combined with the sampler's base seed, so an epoch's order
///      is reproducible while consecutive epochs still differ.
pub trait Sampler: Send + Sync {
    type Item: Send + Sync;

    fn iter(&self, epoch: usize) -> Box<dyn Iterator<Item = Self::Item> + Send + '_>;
}

/// ============================================================================
/// Yields indices in order `(0, 1, 2, ..., dataset_size - 1)` for every epoch.
///
/// Useful for evaluation runs that must visit the clips in file order.
///
/// # Examples
/// ```ignore
/// let sampler = SequentialSampler::new(5);
/// let indices: Vec<_> = sampler.iter(0).collect();
/// assert_eq!(indices, vec![0, 1, 2, 3, 4]);
/// ```
#[derive(Debug, Clone)]
pub struct SequentialSampler {
    dataset_size: usize,
}

impl SequentialSampler {
    pub fn new(dataset_size: usize) -> Self {
        Self { dataset_size }
    }
}

impl Sampler for SequentialSampler {
    type Item = usize;

    fn iter(&self, _epoch: usize) -> Box<dyn Iterator<Item = usize> + Send + '_> {
        Box::new(0..self.dataset_size)
    }
}

/// ============================================================================
/// A fresh random permutation of `0..dataset_size` for every epoch.
///
/// # Seed Handling
/// For each epoch a fresh RNG is derived as `base_seed + epoch`. At epoch 0 the
/// seed is `base_seed`, at epoch 1 it is `base_seed + 1`, and so on. A scheduler
/// that bumps its epoch on every reset therefore gets a new, reproducible
/// permutation after each reset.
///
/// # Example usage
/// ```ignore
/// let sampler = RandomSampler::new(517, 42)?;
/// assert_eq!(sampler.iter(0).count(), 517);
/// ```
#[derive(Debug, Clone)]
pub struct RandomSampler {
    dataset_size: usize,
    base_seed: u64,
}

impl RandomSampler {
    pub fn new(dataset_size: usize, base_seed: u64) -> Result<Self> {
        ensure!(
            dataset_size > 0,
            "RandomSampler needs a non-empty catalog, but got dataset_size={}",
            dataset_size
        );
        Ok(Self {
            dataset_size,
            base_seed,
        })
    }

    #[inline]
    fn derive_rng_for_epoch(&self, epoch: usize) -> StdRng {
        StdRng::seed_from_u64(self.base_seed.wrapping_add(epoch as u64))
    }
}

impl Sampler for RandomSampler {
    type Item = usize;

    fn iter(&self, epoch: usize) -> Box<dyn Iterator<Item = usize> + Send + '_> {
        let mut indices: Vec<_> = (0..self.dataset_size).collect();
        indices.shuffle(&mut self.derive_rng_for_epoch(epoch));
        Box::new(indices.into_iter())
    }
}
