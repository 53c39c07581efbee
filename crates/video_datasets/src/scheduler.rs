use crate::sampler::Sampler;
use anyhow::{ensure, Result};

/// One scheduled batch slot: the catalog index to load and whether the item is
/// served as its horizontally flipped variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledIndex {
    pub index: usize,
    pub flip: bool,
}

/// Maps an external (virtual) index to `(position, flip)`.
///
/// `position` is the slot in the current permutation (`external_index % true_size`).
/// Without doubling `flip` is always `false`. With doubling, even passes over
/// the catalog serve odd positions flipped and odd passes serve even positions
/// flipped, so every item is seen once in each orientation per two passes.
///
/// ```text
/// true_size = 5, doubled
/// external: 0 1 2 3 4 | 5 6 7 8 9
/// flipped:  - x - x - | x - x - x
/// ```
pub fn decompose(external_index: usize, true_size: usize, doubled: bool) -> (usize, bool) {
    let position = external_index % true_size;
    let second_pass = (external_index / true_size) % 2 == 1;
    let odd_position = position % 2 == 1;
    (position, doubled && (second_pass != odd_position))
}

/// Circular index scheduler over a shuffled permutation of the true catalog.
///
/// The externally visible size is `true_size * repetitions`, doubled when flipped
/// variants are served as separate items. A monotonically increasing `row` cursor
/// walks that virtual range; each window of `batch_size` rows is mapped back onto
/// the permutation with wraparound (`permutation[start..] ++ permutation[..end]`).
/// Once the next window would run past the virtual size, the scheduler resets:
/// `row` goes back to zero and the permutation is redrawn for the next epoch.
///
/// The permutation comes from any [`Sampler`], so evaluation runs can use a
/// [`SequentialSampler`](crate::sampler::SequentialSampler) and training-style
/// runs a [`RandomSampler`](crate::sampler::RandomSampler).
///
/// # Example
/// ```ignore
/// let sampler = RandomSampler::new(clips.len(), seed)?;
/// let mut scheduler = CircularIndexScheduler::new(sampler, clips.len(), 4, true)?;
/// for slot in scheduler.next_window(8)? {
///     load(clips[slot.index], slot.flip);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CircularIndexScheduler<S> {
    sampler: S,
    true_size: usize,
    repetitions: usize,
    double_with_flipped: bool,
    row: usize,
    epoch: usize,
    permutation: Vec<usize>,
}

impl<S: Sampler<Item = usize>> CircularIndexScheduler<S> {
    pub fn new(
        sampler: S,
        true_size: usize,
        repetitions: usize,
        double_with_flipped: bool,
    ) -> Result<Self> {
        ensure!(true_size > 0, "Scheduler needs a non-empty catalog");
        ensure!(
            repetitions > 0,
            "repetitions_per_epoch must be positive, but got {}",
            repetitions
        );

        let permutation = draw_permutation(&sampler, 0, true_size)?;
        Ok(Self {
            sampler,
            true_size,
            repetitions,
            double_with_flipped,
            row: 0,
            epoch: 0,
            permutation,
        })
    }

    /// Externally visible number of items per epoch.
    pub fn size(&self) -> usize {
        let doubling = if self.double_with_flipped { 2 } else { 1 };
        self.true_size * self.repetitions * doubling
    }

    pub fn true_size(&self) -> usize {
        self.true_size
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// Zeroes the row cursor and draws the permutation of the next epoch.
    pub fn reset(&mut self) -> Result<()> {
        self.epoch += 1;
        self.permutation = draw_permutation(&self.sampler, self.epoch, self.true_size)?;
        self.row = 0;
        log::debug!(
            "Scheduler reset: epoch {} over {} items ({} visible)",
            self.epoch,
            self.true_size,
            self.size()
        );
        Ok(())
    }

    /// Returns the next `batch_size` slots and advances the cursor.
    ///
    /// # Panics
    /// If the computed window does not hold exactly `batch_size` indices. This
    /// cannot happen for a validated `batch_size` and signals a scheduler bug.
    pub fn next_window(&mut self, batch_size: usize) -> Result<Vec<ScheduledIndex>> {
        ensure!(batch_size > 0, "batch_size must be positive");
        ensure!(
            batch_size <= self.true_size,
            "batch_size ({}) exceeds the {} items of the catalog",
            batch_size,
            self.true_size
        );

        if self.row + batch_size > self.size() {
            self.reset()?;
        }

        let start = self.row % self.true_size;
        let end = (start + batch_size) % self.true_size;
        let window: Vec<usize> = if start < end {
            self.permutation[start..end].to_vec()
        } else {
            self.permutation[start..]
                .iter()
                .chain(&self.permutation[..end])
                .copied()
                .collect()
        };
        assert_eq!(
            window.len(),
            batch_size,
            "scheduled window does not match the batch size"
        );

        let visible = self.size();
        let slots = window
            .into_iter()
            .enumerate()
            .map(|(i, index)| {
                let (_, flip) = decompose(
                    (self.row + i) % visible,
                    self.true_size,
                    self.double_with_flipped,
                );
                ScheduledIndex { index, flip }
            })
            .collect();

        self.row += batch_size;
        Ok(slots)
    }
}

fn draw_permutation<S: Sampler<Item = usize>>(
    sampler: &S,
    epoch: usize,
    true_size: usize,
) -> Result<Vec<usize>> {
    let permutation: Vec<usize> = sampler.iter(epoch).collect();
    ensure!(
        permutation.len() == true_size,
        "Sampler yielded {} indices for a catalog of {}",
        permutation.len(),
        true_size
    );
    Ok(permutation)
}
