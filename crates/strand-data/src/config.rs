use crate::corpus::registry::CorpusEntry;
use crate::corpus::{CorpusRegistry, LabelKey, ReaderOptions};
use crate::error::{DataError, DataResult};
use crate::lazy::LoadMode;
use crate::split::validate_split;
use crate::tokenizer::{TokenizerOptions, TokenizerType, NUM_COMMAND_TOKENS};
use crate::window::{TaskType, WindowOptions};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_SEED: u64 = 1234;

/// Every option the dataset pipeline reads.
///
/// Unrecognized keys are kept in `extra` and passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Corpus file paths or registered corpus names; a single string is accepted.
    #[serde(deserialize_with = "one_or_many")]
    pub paths: Vec<String>,
    pub seq_length: usize,
    pub text_key: String,
    pub label_key: String,
    pub prompt_key: String,
    pub lazy: bool,
    pub load_mode: LoadMode,
    pub xl_style: bool,
    pub shuffle: bool,
    pub seed: u64,
    pub split: Vec<f64>,
    pub delim: char,
    pub loose: bool,
    pub binarize_sent: bool,
    pub drop_unlabeled: bool,
    pub tokenizer_type: String,
    pub tokenizer_model_path: Option<PathBuf>,
    pub vocab_size: Option<usize>,
    pub model_type: String,
    pub pad_token: u32,
    #[serde(alias = "character_converage")]
    pub character_coverage: f64,
    pub non_binary_cols: Option<Vec<String>>,
    pub sample_one_document: bool,
    pub random_across_doc_sampling: bool,
    pub ds_type: String,
    pub presplit_sentences: bool,
    pub mem_len: Option<usize>,
    pub num_samples: Option<usize>,
    pub corpora: BTreeMap<String, CorpusEntry>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            seq_length: 1024,
            text_key: "text".to_string(),
            label_key: "label".to_string(),
            prompt_key: "prompt".to_string(),
            lazy: false,
            load_mode: LoadMode::default(),
            xl_style: false,
            shuffle: false,
            seed: DEFAULT_SEED,
            split: vec![1.0],
            delim: ',',
            loose: false,
            binarize_sent: false,
            drop_unlabeled: false,
            tokenizer_type: "CharacterLevelTokenizer".to_string(),
            tokenizer_model_path: None,
            vocab_size: None,
            model_type: "bpe".to_string(),
            pad_token: 0,
            character_coverage: 1.0,
            non_binary_cols: None,
            sample_one_document: false,
            random_across_doc_sampling: true,
            ds_type: String::new(),
            presplit_sentences: false,
            mem_len: None,
            num_samples: None,
            corpora: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(path) => vec![path],
        OneOrMany::Many(paths) => paths,
    })
}

impl DatasetConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> DataResult<Self> {
        if !path.exists() {
            return Err(DataError::InvalidConfig(format!("config file not found: {}", path.display())));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| DataError::InvalidConfig(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(content: &str) -> DataResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> DataResult<()> {
        if self.paths.is_empty() {
            return Err(DataError::InvalidConfig("at least one corpus path is required".to_string()));
        }
        if self.seq_length == 0 {
            return Err(DataError::InvalidConfig("seq_length must be >= 1".to_string()));
        }
        if !self.delim.is_ascii() {
            return Err(DataError::InvalidConfig(format!("delim must be an ASCII character, got {:?}", self.delim)));
        }
        if !self.character_coverage.is_finite() || self.character_coverage <= 0.0 || self.character_coverage > 1.0 {
            return Err(DataError::InvalidConfig("character_coverage must be in (0, 1]".to_string()));
        }
        if self.pad_token as usize >= NUM_COMMAND_TOKENS {
            return Err(DataError::InvalidConfig(format!("pad_token must be below {NUM_COMMAND_TOKENS}")));
        }
        if self.mem_len == Some(0) {
            return Err(DataError::InvalidConfig("mem_len must be >= 1".to_string()));
        }
        validate_split(&self.split)?;
        self.tokenizer_type.parse::<TokenizerType>()?;
        self.task_type()?;
        Ok(())
    }

    pub fn task_type(&self) -> DataResult<TaskType> {
        self.ds_type.parse()
    }

    #[must_use]
    pub fn reader_options(&self) -> ReaderOptions {
        let label_key = match &self.non_binary_cols {
            Some(cols) => LabelKey::Columns(cols.clone()),
            None => LabelKey::Single(self.label_key.clone()),
        };
        ReaderOptions {
            text_key: self.text_key.clone(),
            label_key,
            prompt_key: self.prompt_key.clone(),
            delimiter: u8::try_from(self.delim).unwrap_or(b','),
            loose_json: self.loose,
            binarize_sent: self.binarize_sent,
            drop_unlabeled: self.drop_unlabeled,
        }
    }

    #[must_use]
    pub fn tokenizer_options(&self) -> TokenizerOptions {
        TokenizerOptions {
            tokenizer_type: self.tokenizer_type.clone(),
            model_path: self.tokenizer_model_path.clone(),
            vocab_size: self.vocab_size,
            model_type: self.model_type.clone(),
            pad_token: self.pad_token,
            character_coverage: self.character_coverage,
        }
    }

    #[must_use]
    pub fn window_options(&self) -> WindowOptions {
        WindowOptions {
            max_seq_len: self.seq_length,
            sample_across_doc: !self.sample_one_document,
            random_across_doc_sampling: self.random_across_doc_sampling,
            presplit_sentences: self.presplit_sentences,
            mem_len: self.mem_len,
            num_samples: self.num_samples,
            seed: self.seed,
        }
    }

    /// Registry of the `[corpora.<name>]` entries.
    #[must_use]
    pub fn registry(&self) -> CorpusRegistry {
        CorpusRegistry::from_entries(&self.corpora)
    }
}
