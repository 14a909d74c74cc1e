use crate::dataset::{Dataset, PromptText, PromptTextDataset};
use crate::error::{DataError, DataResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// One or more sources concatenated end to end, optionally permuted once.
///
/// Record `i` of source `k` sits at global index `offset(k) + i` before
/// shuffling, where `offset(k)` is the total length of the sources before `k`.
pub struct CombinedDataset {
    sources: Vec<PromptTextDataset>,
    cumulative_sizes: Vec<usize>,
    permutation: Option<Vec<usize>>,
}

impl CombinedDataset {
    pub fn new(sources: Vec<PromptTextDataset>) -> DataResult<Self> {
        if sources.is_empty() {
            return Err(DataError::InvalidConfig("at least one corpus path is required".to_string()));
        }

        let mut cumulative_sizes = Vec::with_capacity(sources.len());
        let mut total = 0;
        for source in &sources {
            total += source.len();
            cumulative_sizes.push(total);
        }

        Ok(Self { sources, cumulative_sizes, permutation: None })
    }

    #[must_use]
    pub fn single(source: PromptTextDataset) -> Self {
        let len = source.len();
        Self { sources: vec![source], cumulative_sizes: vec![len], permutation: None }
    }

    /// Apply one permutation of the whole index space drawn from `seed`.
    #[must_use]
    pub fn shuffled(mut self, seed: u64) -> Self {
        let mut ids: Vec<usize> = (0..self.len()).collect();
        ids.shuffle(&mut StdRng::seed_from_u64(seed));
        self.permutation = Some(ids);
        self
    }

    #[must_use]
    pub fn is_shuffled(&self) -> bool {
        self.permutation.is_some()
    }

    #[must_use]
    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_lazy(&self) -> bool {
        self.sources.iter().all(PromptTextDataset::is_lazy)
    }

    /// Combined prompt + text weight of the record at global `index`.
    pub fn weight(&self, index: usize) -> DataResult<usize> {
        let (source, local) = self.locate(index)?;
        self.sources[source].weight(local)
    }

    fn locate(&self, index: usize) -> DataResult<(usize, usize)> {
        let len = self.len();
        if index >= len {
            return Err(DataError::IndexOutOfBounds { index, len });
        }
        let index = match &self.permutation {
            Some(ids) => ids[index],
            None => index,
        };

        let source = self.cumulative_sizes.partition_point(|&cum| cum <= index);
        let offset = if source == 0 { 0 } else { self.cumulative_sizes[source - 1] };
        Ok((source, index - offset))
    }
}

impl Dataset for CombinedDataset {
    type Item = PromptText;

    fn len(&self) -> usize {
        self.cumulative_sizes.last().copied().unwrap_or(0)
    }

    fn get(&self, index: usize) -> DataResult<PromptText> {
        let (source, local) = self.locate(index)?;
        self.sources[source].get(local)
    }
}
