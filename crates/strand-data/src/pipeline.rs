//! End-to-end dataset assembly.
//!
//! Resolve (or lazily cache) every source, concatenate, optionally shuffle,
//! build the tokenizer on the combined corpus, split, then wrap each present
//! slot for the configured task.

use crate::combine::CombinedDataset;
use crate::config::DatasetConfig;
use crate::corpus::{resolve_corpus, CorpusRegistry, ReaderOptions};
use crate::dataset::{Dataset, PromptTextDataset};
use crate::error::{DataError, DataResult};
use crate::lazy::{CacheStatus, LazyCache};
use crate::split::{should_split, split_dataset, SplitView};
use crate::tokenizer::{make_tokenizer, SharedTokenizer};
use crate::window::{wrap_splits, wrap_task, TaskDataset};
use std::sync::Arc;

/// Pipeline output: one dataset, or up to three train/val/test slots.
#[derive(Clone)]
pub enum AssembledDataset {
    Single(TaskDataset),
    Split(Vec<Option<TaskDataset>>),
}

impl AssembledDataset {
    /// Every slot in order; `Single` yields one present slot.
    #[must_use]
    pub fn slots(&self) -> Vec<Option<&TaskDataset>> {
        match self {
            Self::Single(ds) => vec![Some(ds)],
            Self::Split(slots) => slots.iter().map(Option::as_ref).collect(),
        }
    }

    #[must_use]
    pub fn is_split(&self) -> bool {
        matches!(self, Self::Split(_))
    }
}

/// Everything a build produced, including the combined corpus it was cut from.
pub struct Assembly {
    pub dataset: AssembledDataset,
    pub tokenizer: SharedTokenizer,
    pub combined: Arc<CombinedDataset>,
}

/// Assemble the task datasets described by `config`.
///
/// When `tokenizer` is `None` one is built from the combined, pre-split corpus.
pub fn make_dataset(
    config: &DatasetConfig,
    registry: &CorpusRegistry,
    tokenizer: Option<SharedTokenizer>,
) -> DataResult<(AssembledDataset, SharedTokenizer)> {
    let assembly = assemble(config, registry, tokenizer)?;
    Ok((assembly.dataset, assembly.tokenizer))
}

/// Like [`make_dataset`], also returning the combined corpus.
pub fn assemble(
    config: &DatasetConfig,
    registry: &CorpusRegistry,
    tokenizer: Option<SharedTokenizer>,
) -> DataResult<Assembly> {
    config.validate()?;
    let task = config.task_type()?;
    let reader = config.reader_options();

    let sources = config
        .paths
        .iter()
        .map(|id| load_source(id, config, &reader, registry))
        .collect::<DataResult<Vec<_>>>()?;

    let mut combined = CombinedDataset::new(sources)?;
    if config.shuffle {
        combined = combined.shuffled(config.seed);
    }
    let combined = Arc::new(combined);
    tracing::info!(
        sources = combined.num_sources(),
        records = combined.len(),
        shuffled = combined.is_shuffled(),
        lazy = combined.is_lazy(),
        "combined corpus"
    );

    let tokenizer = match tokenizer {
        Some(tokenizer) => tokenizer,
        None => make_tokenizer(&config.tokenizer_options(), &combined)?,
    };

    let window = config.window_options();
    let dataset = if should_split(&config.split) {
        let slots = split_dataset(&combined, &config.split)?;
        for (slot, view) in slots.iter().enumerate() {
            tracing::debug!(slot, records = view.as_ref().map(Dataset::len), "split slot");
        }
        AssembledDataset::Split(wrap_splits(task, config.xl_style, slots, &tokenizer, &window)?)
    } else {
        if config.split.len() > 1 {
            tracing::debug!(split = ?config.split, "single effective partition, not splitting");
        }
        AssembledDataset::Single(wrap_task(
            task,
            config.xl_style,
            SplitView::full(Arc::clone(&combined)),
            &tokenizer,
            &window,
        )?)
    };

    tracing::info!(task = %task, xl_style = config.xl_style, split = dataset.is_split(), "assembled dataset");
    Ok(Assembly { dataset, tokenizer, combined })
}

fn load_source(
    id: &str,
    config: &DatasetConfig,
    reader: &ReaderOptions,
    registry: &CorpusRegistry,
) -> DataResult<PromptTextDataset> {
    if !config.lazy {
        return Ok(PromptTextDataset::from_resolved(resolve_corpus(id, reader, registry)?));
    }

    let corpus = registry.get(id).ok_or_else(|| DataError::UnsupportedLazyCorpus(id.to_string()))?;
    let materialized = LazyCache::new(config.load_mode).materialize(corpus.path(), || corpus.load(reader))?;
    if materialized.status == CacheStatus::Created {
        tracing::info!(corpus = id, "created lazy cache");
    }
    Ok(materialized.dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Tokenizer;
    use tempfile::TempDir;

    fn write_json(temp: &TempDir, name: &str, n: usize) -> String {
        let path = temp.path().join(name);
        let rows: Vec<String> = (0..n).map(|i| format!(r#"{{"text": "record number {i}"}}"#)).collect();
        std::fs::write(&path, rows.join("\n")).unwrap();
        path.display().to_string()
    }

    fn config(paths: Vec<String>) -> DatasetConfig {
        DatasetConfig { paths, loose: true, seq_length: 16, ..Default::default() }
    }

    #[test]
    fn test_single_plain_dataset() {
        let temp = TempDir::new().unwrap();
        let path = write_json(&temp, "a.json", 5);
        let (dataset, tokenizer) = make_dataset(&config(vec![path]), &CorpusRegistry::new(), None).unwrap();

        match dataset {
            AssembledDataset::Single(TaskDataset::Plain(view)) => assert_eq!(view.len(), 5),
            _ => panic!("expected a single plain dataset"),
        }
        assert_eq!(tokenizer.name(), "CharacterLevelTokenizer");
    }

    #[test]
    fn test_zero_proportions_are_absent() {
        let temp = TempDir::new().unwrap();
        let path = write_json(&temp, "a.json", 10);
        let cfg = DatasetConfig { split: vec![0.9, 0.0, 0.1], ds_type: "gpt2".to_string(), ..config(vec![path]) };
        let (dataset, _) = make_dataset(&cfg, &CorpusRegistry::new(), None).unwrap();

        assert!(dataset.is_split());
        let slots = dataset.slots();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].unwrap().num_records(), 9);
        assert!(slots[1].is_none());
        assert_eq!(slots[2].unwrap().num_records(), 1);
    }

    #[test]
    fn test_degenerate_split_is_not_split() {
        let temp = TempDir::new().unwrap();
        let path = write_json(&temp, "a.json", 4);
        for split in [vec![10.0, 0.0, 0.0], vec![0.0, 3.0], vec![1.0]] {
            let cfg = DatasetConfig { split, ..config(vec![path.clone()]) };
            let (dataset, _) = make_dataset(&cfg, &CorpusRegistry::new(), None).unwrap();
            assert!(!dataset.is_split());
            assert_eq!(dataset.slots()[0].unwrap().num_records(), 4);
        }
    }

    #[test]
    fn test_provided_tokenizer_is_reused() {
        let temp = TempDir::new().unwrap();
        let path = write_json(&temp, "a.json", 3);
        let registry = CorpusRegistry::new();
        let (_, first) = make_dataset(&config(vec![path.clone()]), &registry, None).unwrap();
        let (_, second) = make_dataset(&config(vec![path]), &registry, Some(Arc::clone(&first))).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_lazy_requires_named_corpus() {
        let temp = TempDir::new().unwrap();
        let path = write_json(&temp, "a.json", 3);
        let cfg = DatasetConfig { lazy: true, ..config(vec![path.clone()]) };
        let err = make_dataset(&cfg, &CorpusRegistry::new(), None).err().unwrap();
        assert!(matches!(err, DataError::UnsupportedLazyCorpus(id) if id == path));
    }
}
