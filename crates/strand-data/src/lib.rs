//! Strand Data
//!
//! Assembles task-shaped training datasets from text corpora:
//! - Resolving corpus files and named corpora (`corpus`)
//! - Caching large corpora on disk and reopening them lazily (`lazy`)
//! - Concatenating and shuffling sources (`combine`)
//! - Building tokenizers on the combined corpus (`tokenizer`)
//! - Splitting into train/val/test slices (`split`)
//! - Windowing slices for BERT, GPT-2 or Transformer-XL training (`window`)

pub mod combine;
pub mod config;
pub mod corpus;
pub mod dataset;
pub mod error;
pub mod lazy;
pub mod pipeline;
pub mod split;
pub mod tokenizer;
pub mod window;

pub use combine::CombinedDataset;
pub use config::{DatasetConfig, DEFAULT_SEED};
pub use corpus::{resolve_corpus, CorpusFormat, CorpusRegistry, FileCorpus, NamedCorpus, ReaderOptions};
pub use dataset::{dataset_fingerprint, Dataset, DatasetId, PromptText, PromptTextDataset, RawRecord, RecordValue, ResolvedDataset};
pub use error::{DataError, DataResult};
pub use lazy::{exists_lazy, make_lazy, CacheStatus, LazyArrayLoader, LazyCache, LazyDataType, LoadMode};
pub use pipeline::{assemble, make_dataset, AssembledDataset, Assembly};
pub use split::{should_split, split_dataset, SplitView, TEST_DATA, TRAIN_DATA, VAL_DATA};
pub use tokenizer::{make_tokenizer, CommandTokens, SharedTokenizer, Tokenizer, TokenizerOptions, TokenizerType};
pub use window::{Sample, TaskDataset, TaskType, WindowOptions};
