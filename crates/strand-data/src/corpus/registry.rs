use crate::corpus::{read_corpus_file, CorpusFormat, ReaderOptions};
use crate::dataset::ResolvedDataset;
use crate::error::DataResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A corpus addressable by name instead of by file path.
///
/// `path` is where the corpus lives on disk; lazy caches for it are placed
/// next to that path.
pub trait NamedCorpus: Send + Sync {
    fn name(&self) -> &str;

    fn path(&self) -> &Path;

    fn load(&self, options: &ReaderOptions) -> DataResult<ResolvedDataset>;
}

/// Named corpus backed by a single JSON/CSV/TSV file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCorpus {
    pub name: String,
    pub path: PathBuf,
    /// Overrides extension-based format detection.
    #[serde(default)]
    pub format: Option<CorpusFormat>,
}

impl FileCorpus {
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), path: path.into(), format: None }
    }

    #[must_use]
    pub fn with_format(mut self, format: CorpusFormat) -> Self {
        self.format = Some(format);
        self
    }
}

impl NamedCorpus for FileCorpus {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self, options: &ReaderOptions) -> DataResult<ResolvedDataset> {
        read_corpus_file(&self.path, self.format, options)
    }
}

/// `[corpora.<name>]` entry of a dataset config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub path: PathBuf,
    #[serde(default)]
    pub format: Option<CorpusFormat>,
}

/// Registry of named corpora, built once and passed to the resolver.
#[derive(Clone, Default)]
pub struct CorpusRegistry {
    corpora: BTreeMap<String, Arc<dyn NamedCorpus>>,
}

impl CorpusRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_entries(entries: &BTreeMap<String, CorpusEntry>) -> Self {
        let mut registry = Self::new();
        for (name, entry) in entries {
            registry.register(FileCorpus { name: name.clone(), path: entry.path.clone(), format: entry.format });
        }
        registry
    }

    /// Register a corpus, replacing any previous corpus with the same name.
    pub fn register<C: NamedCorpus + 'static>(&mut self, corpus: C) {
        self.corpora.insert(corpus.name().to_string(), Arc::new(corpus));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn NamedCorpus>> {
        self.corpora.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.corpora.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.corpora.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.corpora.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.corpora.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawRecord;

    struct StaticCorpus;

    impl NamedCorpus for StaticCorpus {
        fn name(&self) -> &str {
            "static"
        }

        fn path(&self) -> &Path {
            Path::new("/corpora/static")
        }

        fn load(&self, _options: &ReaderOptions) -> DataResult<ResolvedDataset> {
            Ok(ResolvedDataset::new(vec![RawRecord::new("fixed")]))
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = CorpusRegistry::new();
        registry.register(StaticCorpus);
        registry.register(FileCorpus::new("wiki", "/data/wiki.json"));

        assert!(registry.contains("static"));
        assert!(!registry.contains("/data/wiki.json"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["static", "wiki"]);
        assert_eq!(registry.get("wiki").unwrap().path(), Path::new("/data/wiki.json"));

        let loaded = registry.get("static").unwrap().load(&ReaderOptions::default()).unwrap();
        assert_eq!(loaded.texts(), vec!["fixed"]);
    }

    #[test]
    fn test_from_entries() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "news".to_string(),
            CorpusEntry { path: PathBuf::from("news.dat"), format: Some(CorpusFormat::Tsv) },
        );
        let registry = CorpusRegistry::from_entries(&entries);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("news").unwrap().name(), "news");
    }
}
