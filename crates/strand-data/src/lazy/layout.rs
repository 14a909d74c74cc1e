use crate::error::DataResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which column of a prompt/text corpus a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LazyDataType {
    Prompt,
    Text,
}

impl LazyDataType {
    pub const ALL: [Self; 2] = [Self::Prompt, Self::Text];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for LazyDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filesystem layout of a lazy cache.
///
/// A corpus at `data/wiki.json` is cached under `data/wiki.json.lazy/`, holding one
/// data file and one length index per data type.
#[derive(Debug, Clone)]
pub struct LazyLayout {
    root: PathBuf,
}

impl LazyLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Layout for the corpus stored at `path`: `.lazy` is appended to the full
    /// file name, so `wiki.json` and `wiki.csv` get separate caches.
    #[must_use]
    pub fn for_corpus_path(path: &Path) -> Self {
        let mut root = path.as_os_str().to_os_string();
        root.push(".lazy");
        Self::new(PathBuf::from(root))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn data_path(&self, data_type: LazyDataType) -> PathBuf {
        self.root.join(data_type.as_str())
    }

    #[must_use]
    pub fn index_path(&self, data_type: LazyDataType) -> PathBuf {
        self.root.join(format!("{}.len.json", data_type.as_str()))
    }

    pub fn ensure_dir(&self) -> DataResult<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }
}
