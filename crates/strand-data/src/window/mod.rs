//! Task-specific windowing over split slices.
//!
//! Every windower reads documents through a [`TokenizedView`] and derives all
//! randomness for sample `i` from `(seed, i)`, so `get(i)` is a pure function
//! of the index.

pub mod bert;
pub mod gpt2;
pub mod xl;

pub use bert::{BertSample, BertSentencePairDataset};
pub use gpt2::{Gpt2Dataset, Gpt2Sample};
pub use xl::{XlDataset, XlSample};

use crate::dataset::{Dataset, PromptText};
use crate::error::{DataError, DataResult};
use crate::split::SplitView;
use crate::tokenizer::{SharedTokenizer, TokenizedView};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Training objective a split is shaped for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskType {
    #[default]
    None,
    Bert,
    Gpt2,
}

impl FromStr for TaskType {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "bert" => Ok(Self::Bert),
            "gpt2" | "gpt-2" => Ok(Self::Gpt2),
            _ => Err(DataError::UnsupportedTask(s.to_string())),
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Bert => write!(f, "bert"),
            Self::Gpt2 => write!(f, "gpt2"),
        }
    }
}

/// Parameters shared by every windower.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowOptions {
    pub max_seq_len: usize,
    /// Let a window continue into following documents.
    pub sample_across_doc: bool,
    /// Pick continuation documents by weighted draw instead of in order.
    pub random_across_doc_sampling: bool,
    pub presplit_sentences: bool,
    /// XL memory length; defaults to `max_seq_len`.
    pub mem_len: Option<usize>,
    /// Overrides the per-task default sample count.
    pub num_samples: Option<usize>,
    pub seed: u64,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            max_seq_len: 1024,
            sample_across_doc: true,
            random_across_doc_sampling: true,
            presplit_sentences: false,
            mem_len: None,
            num_samples: None,
            seed: 1234,
        }
    }
}

/// One training sample, shaped by the task that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Plain(PromptText),
    Bert(BertSample),
    Gpt2(Gpt2Sample),
    Xl(XlSample),
}

/// A split slice after task wrapping.
#[derive(Clone)]
pub enum TaskDataset {
    Plain(SplitView),
    BertSentencePair(BertSentencePairDataset),
    Gpt2(Gpt2Dataset),
    Xl(XlDataset),
}

impl TaskDataset {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Plain(_) => "plain",
            Self::BertSentencePair(_) => "bert",
            Self::Gpt2(_) => "gpt2",
            Self::Xl(_) => "xl",
        }
    }

    /// Number of underlying records, as opposed to samples.
    #[must_use]
    pub fn num_records(&self) -> usize {
        match self {
            Self::Plain(split) => split.len(),
            Self::BertSentencePair(ds) => ds.num_documents(),
            Self::Gpt2(ds) => ds.num_documents(),
            Self::Xl(ds) => ds.num_documents(),
        }
    }
}

impl Dataset for TaskDataset {
    type Item = Sample;

    fn len(&self) -> usize {
        match self {
            Self::Plain(split) => split.len(),
            Self::BertSentencePair(ds) => ds.len(),
            Self::Gpt2(ds) => ds.len(),
            Self::Xl(ds) => ds.len(),
        }
    }

    fn get(&self, index: usize) -> DataResult<Sample> {
        match self {
            Self::Plain(split) => split.get(index).map(Sample::Plain),
            Self::BertSentencePair(ds) => ds.get(index).map(Sample::Bert),
            Self::Gpt2(ds) => ds.get(index).map(Sample::Gpt2),
            Self::Xl(ds) => ds.get(index).map(Sample::Xl),
        }
    }
}

/// Wrap one split slice for `task`.
pub fn wrap_task(
    task: TaskType,
    xl_style: bool,
    split: SplitView,
    tokenizer: &SharedTokenizer,
    options: &WindowOptions,
) -> DataResult<TaskDataset> {
    let view = || TokenizedView::new(split.clone(), tokenizer.clone());
    Ok(match task {
        TaskType::None => TaskDataset::Plain(split.clone()),
        TaskType::Bert => TaskDataset::BertSentencePair(BertSentencePairDataset::new(view(), options)?),
        TaskType::Gpt2 if xl_style => TaskDataset::Xl(XlDataset::new(view(), options)?),
        TaskType::Gpt2 => TaskDataset::Gpt2(Gpt2Dataset::new(view(), options)?),
    })
}

/// Wrap every present slot independently; absent slots stay absent.
pub fn wrap_splits(
    task: TaskType,
    xl_style: bool,
    splits: Vec<Option<SplitView>>,
    tokenizer: &SharedTokenizer,
    options: &WindowOptions,
) -> DataResult<Vec<Option<TaskDataset>>> {
    splits
        .into_iter()
        .map(|slot| slot.map(|split| wrap_task(task, xl_style, split, tokenizer, options)).transpose())
        .collect()
}

/// RNG for sample `index`, independent of the order samples are requested in.
pub(crate) fn index_rng(seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ index as u64)
}

/// Document sampler weighted by untokenized length.
#[derive(Debug, Clone)]
pub(crate) struct LengthWeighting {
    cumulative: Vec<usize>,
}

impl LengthWeighting {
    pub(crate) fn new(view: &TokenizedView) -> DataResult<Self> {
        let mut cumulative = Vec::with_capacity(view.len());
        let mut total = 0usize;
        for idx in 0..view.len() {
            total += view.weight(idx)?;
            cumulative.push(total);
        }
        Ok(Self { cumulative })
    }

    pub(crate) fn len(&self) -> usize {
        self.cumulative.len()
    }

    /// Draw a document index; uniform when every document is empty.
    pub(crate) fn sample(&self, rng: &mut StdRng) -> usize {
        let total = self.cumulative.last().copied().unwrap_or(0);
        if total == 0 {
            return rng.gen_range(0..self.len().max(1));
        }
        let point = rng.gen_range(0..total);
        self.cumulative.partition_point(|&cum| cum <= point)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::combine::CombinedDataset;
    use crate::dataset::{PromptTextDataset, RawRecord, ResolvedDataset};
    use crate::split::SplitView;
    use crate::tokenizer::{CharacterLevelTokenizer, SharedTokenizer, TokenizedView};
    use std::sync::Arc;

    pub(crate) fn tokenizer(texts: &[&str]) -> SharedTokenizer {
        Arc::new(CharacterLevelTokenizer::fit(texts.iter().copied(), None, 1.0, 0).unwrap())
    }

    pub(crate) fn split(records: Vec<RawRecord>) -> SplitView {
        SplitView::full(Arc::new(CombinedDataset::single(PromptTextDataset::from_resolved(
            ResolvedDataset::new(records),
        ))))
    }

    pub(crate) fn view(texts: &[&str]) -> TokenizedView {
        let records = texts.iter().map(|t| RawRecord::new(*t)).collect();
        TokenizedView::new(split(records), tokenizer(texts))
    }
}
