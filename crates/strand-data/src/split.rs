//! Deterministic train/val/test partitioning.
//!
//! Slices are contiguous, order-preserving index ranges over the combined
//! dataset. Boundaries are the floors of the cumulative normalized
//! proportions times the dataset size, so the fractional remainder of each
//! slice carries forward into the next one; the last non-zero slice ends at
//! the dataset size. This keeps `sum(sizes) == len` for every input.

use crate::combine::CombinedDataset;
use crate::dataset::{Dataset, PromptText};
use crate::error::{DataError, DataResult};
use std::ops::Range;
use std::sync::Arc;

pub const TRAIN_DATA: usize = 0;
pub const VAL_DATA: usize = 1;
pub const TEST_DATA: usize = 2;

const MAX_SPLITS: usize = 3;

/// Whether `split` describes more than one effective partition.
///
/// ```
/// use strand_data::split::should_split;
/// assert!(!should_split(&[10.0, 0.0, 0.0]));
/// assert!(should_split(&[1.0, 0.1, 0.2]));
/// ```
#[must_use]
pub fn should_split(split: &[f64]) -> bool {
    let sum: f64 = split.iter().sum();
    let max = split.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    max / sum != 1.0
}

pub fn validate_split(split: &[f64]) -> DataResult<()> {
    if split.is_empty() || split.len() > MAX_SPLITS {
        return Err(DataError::InvalidSplit(format!(
            "expected 1 to {MAX_SPLITS} proportions, got {}",
            split.len()
        )));
    }
    if split.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(DataError::InvalidSplit(format!("proportions must be finite and >= 0: {split:?}")));
    }
    if split.iter().sum::<f64>() <= 0.0 {
        return Err(DataError::InvalidSplit("split cannot sum to 0".to_string()));
    }
    Ok(())
}

/// Slice sizes for a dataset of `total` records; `None` marks a zero proportion.
pub fn split_sizes(total: usize, split: &[f64]) -> DataResult<Vec<Option<usize>>> {
    Ok(split_ranges(total, split)?.into_iter().map(|r| r.map(|r| r.len())).collect())
}

fn split_ranges(total: usize, split: &[f64]) -> DataResult<Vec<Option<Range<usize>>>> {
    validate_split(split)?;

    let sum: f64 = split.iter().sum();
    let last_nonzero = split.iter().rposition(|p| *p > 0.0);

    let mut ranges = Vec::with_capacity(split.len());
    let mut cumulative = 0.0;
    let mut start = 0;
    for (idx, proportion) in split.iter().enumerate() {
        if *proportion == 0.0 {
            ranges.push(None);
            continue;
        }
        cumulative += proportion / sum;
        let end = if Some(idx) == last_nonzero {
            total
        } else {
            // Tolerance keeps e.g. 0.9 * 150 from flooring to 134.
            ((cumulative * total as f64) + 1e-9).floor() as usize
        };
        let end = end.clamp(start, total);
        ranges.push(Some(start..end));
        start = end;
    }
    Ok(ranges)
}

/// Non-owning view over a contiguous range of a [`CombinedDataset`].
#[derive(Clone)]
pub struct SplitView {
    dataset: Arc<CombinedDataset>,
    range: Range<usize>,
}

impl SplitView {
    /// View over the whole dataset.
    #[must_use]
    pub fn full(dataset: Arc<CombinedDataset>) -> Self {
        let range = 0..dataset.len();
        Self { dataset, range }
    }

    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    #[must_use]
    pub fn source(&self) -> &Arc<CombinedDataset> {
        &self.dataset
    }

    pub fn weight(&self, index: usize) -> DataResult<usize> {
        self.dataset.weight(self.global(index)?)
    }

    fn global(&self, index: usize) -> DataResult<usize> {
        if index >= self.len() {
            return Err(DataError::IndexOutOfBounds { index, len: self.len() });
        }
        Ok(self.range.start + index)
    }
}

impl Dataset for SplitView {
    type Item = PromptText;

    fn len(&self) -> usize {
        self.range.len()
    }

    fn get(&self, index: usize) -> DataResult<PromptText> {
        self.dataset.get(self.global(index)?)
    }
}

/// Partition `dataset` by `split`. Zero proportions yield `None`.
pub fn split_dataset(dataset: &Arc<CombinedDataset>, split: &[f64]) -> DataResult<Vec<Option<SplitView>>> {
    let ranges = split_ranges(dataset.len(), split)?;
    Ok(ranges
        .into_iter()
        .map(|range| range.map(|range| SplitView { dataset: Arc::clone(dataset), range }))
        .collect())
}
