//! Tokenizer construction.
//!
//! Tokenizers are built once per pipeline run, either handed in by the caller
//! or fitted on the text view of the combined (pre-split) corpus.

pub mod character;
pub mod subword;
pub mod view;

pub use character::CharacterLevelTokenizer;
pub use subword::{BpeTokenizer, SubwordTokenizer, WordPieceTokenizer};
pub use view::{Document, TokenizedView};

use crate::combine::CombinedDataset;
use crate::dataset::{Dataset, RecordValue};
use crate::error::{DataError, DataResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

pub type SharedTokenizer = Arc<dyn Tokenizer>;

/// Text to id encoder shared by every pipeline stage after construction.
pub trait Tokenizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn encode(&self, text: &str) -> DataResult<Vec<u32>>;

    fn vocab_size(&self) -> usize;

    fn command_tokens(&self) -> &CommandTokens;

    /// Ids that may stand in as random replacement tokens.
    fn text_token_range(&self) -> std::ops::Range<u32> {
        NUM_COMMAND_TOKENS as u32..self.vocab_size() as u32
    }
}

pub const NUM_COMMAND_TOKENS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Pad,
    Eos,
    Bos,
    Unk,
    Sep,
    Cls,
    Mask,
}

impl CommandKind {
    pub const ALL: [Self; NUM_COMMAND_TOKENS] =
        [Self::Pad, Self::Eos, Self::Bos, Self::Unk, Self::Sep, Self::Cls, Self::Mask];
}

/// Ids of the control tokens every tokenizer provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTokens {
    pub pad: u32,
    pub eos: u32,
    pub bos: u32,
    pub unk: u32,
    pub sep: u32,
    pub cls: u32,
    pub mask: u32,
}

impl CommandTokens {
    /// Order in which command tokens occupy ids `0..7`, with pad at `pad_token`.
    pub fn layout(pad_token: u32) -> DataResult<[CommandKind; NUM_COMMAND_TOKENS]> {
        let pad = pad_token as usize;
        if pad >= NUM_COMMAND_TOKENS {
            return Err(DataError::InvalidConfig(format!(
                "pad_token must be below {NUM_COMMAND_TOKENS}, got {pad_token}"
            )));
        }
        let mut layout = CommandKind::ALL;
        layout.swap(0, pad);
        Ok(layout)
    }

    /// Command tokens for ids assigned in `layout` order.
    #[must_use]
    pub fn from_layout(layout: &[CommandKind; NUM_COMMAND_TOKENS]) -> Self {
        let ids: HashMap<CommandKind, u32> = layout.iter().enumerate().map(|(i, k)| (*k, i as u32)).collect();
        Self::from_lookup(|kind| ids[&kind])
    }

    pub(crate) fn from_lookup(mut id: impl FnMut(CommandKind) -> u32) -> Self {
        Self {
            pad: id(CommandKind::Pad),
            eos: id(CommandKind::Eos),
            bos: id(CommandKind::Bos),
            unk: id(CommandKind::Unk),
            sep: id(CommandKind::Sep),
            cls: id(CommandKind::Cls),
            mask: id(CommandKind::Mask),
        }
    }

    #[must_use]
    pub fn get(&self, kind: CommandKind) -> u32 {
        match kind {
            CommandKind::Pad => self.pad,
            CommandKind::Eos => self.eos,
            CommandKind::Bos => self.bos,
            CommandKind::Unk => self.unk,
            CommandKind::Sep => self.sep,
            CommandKind::Cls => self.cls,
            CommandKind::Mask => self.mask,
        }
    }
}

/// Tokenizer families the factory can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenizerType {
    CharacterLevel,
    WordPiece,
    Bpe,
}

impl FromStr for TokenizerType {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "characterleveltokenizer" | "character" | "char" => Ok(Self::CharacterLevel),
            "wordpiecetokenizer" | "bertwordpiecetokenizer" | "wordpiece" => Ok(Self::WordPiece),
            "bpetokenizer" | "gpt2bpetokenizer" | "bpe" => Ok(Self::Bpe),
            _ => Err(DataError::UnsupportedTokenizer(s.to_string())),
        }
    }
}

/// Construction parameters for [`make_tokenizer`].
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizerOptions {
    pub tokenizer_type: String,
    pub model_path: Option<PathBuf>,
    pub vocab_size: Option<usize>,
    pub model_type: String,
    pub pad_token: u32,
    pub character_coverage: f64,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            tokenizer_type: "CharacterLevelTokenizer".to_string(),
            model_path: None,
            vocab_size: None,
            model_type: "bpe".to_string(),
            pad_token: 0,
            character_coverage: 1.0,
        }
    }
}

/// Build a tokenizer of the requested type, fitting it on `corpus` when no
/// pretrained model file is given.
pub fn make_tokenizer(options: &TokenizerOptions, corpus: &CombinedDataset) -> DataResult<SharedTokenizer> {
    let kind: TokenizerType = options.tokenizer_type.parse()?;

    let tokenizer: SharedTokenizer = match (kind, &options.model_path) {
        (TokenizerType::CharacterLevel, _) => {
            let texts = corpus_texts(corpus)?;
            Arc::new(CharacterLevelTokenizer::fit(
                texts.iter().map(String::as_str),
                options.vocab_size,
                options.character_coverage,
                options.pad_token,
            )?)
        }
        (TokenizerType::WordPiece, Some(path)) => Arc::new(WordPieceTokenizer::from_file(path)?),
        (TokenizerType::WordPiece, None) => Arc::new(WordPieceTokenizer::fit(&corpus_texts(corpus)?, options)?),
        (TokenizerType::Bpe, Some(path)) => Arc::new(BpeTokenizer::from_file(path)?),
        (TokenizerType::Bpe, None) => Arc::new(BpeTokenizer::fit(&corpus_texts(corpus)?, options)?),
    };

    tracing::info!(
        tokenizer = tokenizer.name(),
        vocab_size = tokenizer.vocab_size(),
        pretrained = options.model_path.is_some(),
        "built tokenizer"
    );
    Ok(tokenizer)
}

/// Raw text view of the corpus; pre-tokenized records carry no text to fit on.
fn corpus_texts(corpus: &CombinedDataset) -> DataResult<Vec<String>> {
    let mut texts = Vec::with_capacity(corpus.len());
    let mut skipped = 0usize;
    for idx in 0..corpus.len() {
        match corpus.get(idx)?.text {
            RecordValue::Text(s) => texts.push(s),
            RecordValue::Tokens(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!(skipped, "pre-tokenized records ignored while fitting tokenizer");
    }
    Ok(texts)
}

/// Characters ordered by descending frequency, truncated once `coverage` of
/// all occurrences is reached.
pub(crate) fn coverage_alphabet<'a>(texts: impl IntoIterator<Item = &'a str>, coverage: f64) -> Vec<char> {
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for text in texts {
        for ch in text.chars() {
            *counts.entry(ch).or_insert(0) += 1;
            total += 1;
        }
    }

    let mut ordered: Vec<(char, usize)> = counts.into_iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let target = coverage.clamp(0.0, 1.0) * total as f64;
    let mut covered = 0usize;
    let mut alphabet = Vec::new();
    for (ch, count) in ordered {
        if covered as f64 >= target {
            break;
        }
        alphabet.push(ch);
        covered += count;
    }
    alphabet
}
