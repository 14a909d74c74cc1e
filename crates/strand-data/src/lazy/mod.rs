//! On-disk lazy cache for large corpora.
//!
//! A corpus is parsed once and persisted as two indexed arrays (`prompt`,
//! `text`); later runs reopen them memory-mapped instead of re-parsing.

pub mod layout;
pub mod loader;
pub mod store;

pub use layout::{LazyDataType, LazyLayout};
pub use loader::{LazyArrayLoader, LoadMode};
pub use store::{exists_lazy, make_lazy, LazyIndex, ValueKind};

use crate::dataset::{PromptTextDataset, ResolvedDataset};
use crate::error::DataResult;
use serde::Serialize;
use std::path::Path;

/// Outcome of [`LazyCache::materialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Created,
    Reused,
}

pub struct Materialized {
    pub dataset: PromptTextDataset,
    pub status: CacheStatus,
}

/// Materializes and reopens lazy caches.
#[derive(Debug, Clone, Copy, Default)]
pub struct LazyCache {
    mode: LoadMode,
}

impl LazyCache {
    #[must_use]
    pub fn new(mode: LoadMode) -> Self {
        Self { mode }
    }

    /// Whether both the `prompt` and `text` entries exist for `path`.
    #[must_use]
    pub fn exists(path: &Path) -> bool {
        LazyDataType::ALL.iter().all(|dt| exists_lazy(path, *dt))
    }

    /// Ensure the cache for `path` exists, then open loaders over it.
    ///
    /// `load` re-parses the raw corpus and is only invoked when at least one of
    /// the two entries is missing.
    pub fn materialize<F>(&self, path: &Path, load: F) -> DataResult<Materialized>
    where
        F: FnOnce() -> DataResult<ResolvedDataset>,
    {
        let status = if Self::exists(path) {
            tracing::debug!(path = %path.display(), "reusing lazy cache");
            CacheStatus::Reused
        } else {
            let resolved = load()?;
            let records = resolved.len();
            let (prompts, texts) = resolved.into_columns();
            make_lazy(path, &prompts, LazyDataType::Prompt)?;
            make_lazy(path, &texts, LazyDataType::Text)?;
            tracing::info!(path = %path.display(), records, "materialized lazy cache");
            CacheStatus::Created
        };

        let prompts = LazyArrayLoader::open(path, LazyDataType::Prompt, self.mode)?;
        let texts = LazyArrayLoader::open(path, LazyDataType::Text, self.mode)?;
        Ok(Materialized { dataset: PromptTextDataset::lazy(prompts, texts)?, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, RawRecord, RecordValue};
    use std::cell::Cell;
    use tempfile::TempDir;

    fn corpus() -> ResolvedDataset {
        ResolvedDataset::new(vec![
            RawRecord::new("one").with_prompt("p1"),
            RawRecord::new("two"),
            RawRecord::new("three").with_prompt("p3"),
        ])
    }

    #[test]
    fn test_materialize_invokes_loader_once() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("named.json");
        let calls = Cell::new(0);
        let cache = LazyCache::default();

        let first = cache
            .materialize(&path, || {
                calls.set(calls.get() + 1);
                Ok(corpus())
            })
            .unwrap();
        assert_eq!(first.status, CacheStatus::Created);

        let second = cache
            .materialize(&path, || {
                calls.set(calls.get() + 1);
                Ok(corpus())
            })
            .unwrap();
        assert_eq!(second.status, CacheStatus::Reused);
        assert_eq!(calls.get(), 1);
        assert_eq!(second.dataset.len(), 3);
    }

    #[test]
    fn test_materialize_preserves_alignment_and_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("named.json");
        let original = corpus();

        let ds = LazyCache::default().materialize(&path, || Ok(original.clone())).unwrap().dataset;
        assert!(ds.is_lazy());
        assert_eq!(ds.prompts().len(), ds.texts().len());

        for (idx, record) in original.records().iter().enumerate() {
            let item = ds.get(idx).unwrap();
            assert_eq!(item.text, RecordValue::from(record.text.as_str()));
            assert_eq!(item.prompt, RecordValue::from(record.prompt.clone().unwrap_or_default()));
        }
    }

    #[test]
    fn test_lazy_weights_match_in_memory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("accents.json");
        let original = ResolvedDataset::new(vec![
            RawRecord::new("café crème").with_prompt("größe"),
            RawRecord::new("日本語のテキスト"),
            RawRecord::new("plain"),
        ]);

        let memory = PromptTextDataset::from_resolved(original.clone());
        let lazy = LazyCache::default().materialize(&path, || Ok(original)).unwrap().dataset;
        for idx in 0..memory.len() {
            assert_eq!(lazy.weight(idx).unwrap(), memory.weight(idx).unwrap());
        }
        assert_eq!(memory.weight(1).unwrap(), "日本語のテキスト".len());
    }

    #[test]
    fn test_partial_cache_is_rebuilt() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("named.json");
        make_lazy(&path, &[RecordValue::from("stale")], LazyDataType::Prompt).unwrap();
        assert!(!LazyCache::exists(&path));

        let calls = Cell::new(0);
        let out = LazyCache::new(LoadMode::Buffered)
            .materialize(&path, || {
                calls.set(calls.get() + 1);
                Ok(corpus())
            })
            .unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(out.status, CacheStatus::Created);
        assert_eq!(out.dataset.len(), 3);
    }

    #[test]
    fn test_loader_error_propagates() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("named.json");
        let result = LazyCache::default().materialize(&path, || {
            Err(crate::error::DataError::corpus("named.json", "unreadable"))
        });
        assert!(result.is_err());
        assert!(!LazyCache::exists(&path));
    }
}
