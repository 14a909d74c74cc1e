use std::path::PathBuf;
use thiserror::Error;

pub type DataResult<T> = std::result::Result<T, DataError>;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("data file type {extension:?} is not supported")]
    UnsupportedFormat { extension: String },

    #[error("lazy loading requires a registered named corpus, got {0:?}")]
    UnsupportedLazyCorpus(String),

    #[error("unsupported tokenizer type: {0}")]
    UnsupportedTokenizer(String),

    #[error("unsupported dataset task type: {0}")]
    UnsupportedTask(String),

    #[error("invalid split proportions: {0}")]
    InvalidSplit(String),

    #[error("invalid dataset config: {0}")]
    InvalidConfig(String),

    #[error("corpus error in {}: {message}", path.display())]
    Corpus { path: PathBuf, message: String },

    #[error("lazy cache error: {0}")]
    LazyCache(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("index {index} out of bounds for dataset of size {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DataError {
    pub(crate) fn corpus(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Corpus { path: path.into(), message: message.into() }
    }

    pub(crate) fn tokenizer(err: impl std::fmt::Display) -> Self {
        Self::Tokenizer(err.to_string())
    }
}
