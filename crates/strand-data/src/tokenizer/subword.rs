//! Subword tokenizers backed by the `tokenizers` crate.
//!
//! A model is either loaded from a serialized `tokenizer.json` or trained on
//! the corpus text with the matching trainer. Fitted models pre-tokenize on
//! whitespace and punctuation before handing words to the model.

use crate::error::{DataError, DataResult};
use crate::tokenizer::{coverage_alphabet, CommandKind, CommandTokens, Tokenizer, TokenizerOptions};
use std::collections::HashMap;
use std::path::Path;
use tokenizers::models::bpe::{BpeTrainer, BPE};
use tokenizers::models::wordpiece::{WordPiece, WordPieceTrainer};
use tokenizers::{AddedToken, Model, Trainer};

/// Subword model families the factory can train.
pub trait SubwordModel: Model + Send + Sync + Sized {
    const NAME: &'static str;
    const DEFAULT_VOCAB_SIZE: usize;
    /// Whether fitted models lowercase input for uncased `model_type`s.
    const LOWERCASE: bool;

    fn special_token(kind: CommandKind) -> &'static str;

    fn train(
        texts: &[String],
        vocab_size: usize,
        specials: Vec<AddedToken>,
        limit_alphabet: Option<usize>,
        lowercase: bool,
    ) -> DataResult<Self>;
}

impl SubwordModel for WordPiece {
    const NAME: &'static str = "WordPieceTokenizer";
    const DEFAULT_VOCAB_SIZE: usize = 30_000;
    const LOWERCASE: bool = true;

    fn special_token(kind: CommandKind) -> &'static str {
        match kind {
            CommandKind::Pad => "[PAD]",
            CommandKind::Eos => "[EOS]",
            CommandKind::Bos => "[BOS]",
            CommandKind::Unk => "[UNK]",
            CommandKind::Sep => "[SEP]",
            CommandKind::Cls => "[CLS]",
            CommandKind::Mask => "[MASK]",
        }
    }

    fn train(
        texts: &[String],
        vocab_size: usize,
        specials: Vec<AddedToken>,
        limit_alphabet: Option<usize>,
        lowercase: bool,
    ) -> DataResult<Self> {
        let mut builder = WordPieceTrainer::builder()
            .vocab_size(vocab_size)
            .show_progress(false)
            .special_tokens(specials);
        if let Some(limit) = limit_alphabet {
            builder = builder.limit_alphabet(limit);
        }
        let mut trainer = builder.build();

        trainer
            .feed(texts.iter(), |s| Ok(pre_tokenize(s, lowercase)))
            .map_err(DataError::tokenizer)?;
        let mut model = Self::default();
        trainer.train(&mut model).map_err(DataError::tokenizer)?;
        Ok(model)
    }
}

impl SubwordModel for BPE {
    const NAME: &'static str = "BpeTokenizer";
    const DEFAULT_VOCAB_SIZE: usize = 50_000;
    const LOWERCASE: bool = false;

    fn special_token(kind: CommandKind) -> &'static str {
        match kind {
            CommandKind::Pad => "<pad>",
            CommandKind::Eos => "<|endoftext|>",
            CommandKind::Bos => "<s>",
            CommandKind::Unk => "<unk>",
            CommandKind::Sep => "<sep>",
            CommandKind::Cls => "<cls>",
            CommandKind::Mask => "<mask>",
        }
    }

    fn train(
        texts: &[String],
        vocab_size: usize,
        specials: Vec<AddedToken>,
        limit_alphabet: Option<usize>,
        lowercase: bool,
    ) -> DataResult<Self> {
        let mut builder = BpeTrainer::builder()
            .vocab_size(vocab_size)
            .show_progress(false)
            .special_tokens(specials);
        if let Some(limit) = limit_alphabet {
            builder = builder.limit_alphabet(limit);
        }
        let mut trainer = builder.build();

        trainer
            .feed(texts.iter(), |s| Ok(pre_tokenize(s, lowercase)))
            .map_err(DataError::tokenizer)?;
        let mut model = Self::default();
        trainer.train(&mut model).map_err(DataError::tokenizer)?;
        Ok(model)
    }
}

enum Backend<M> {
    Pretrained(Box<tokenizers::Tokenizer>),
    Fitted { model: M, lowercase: bool },
}

/// Tokenizer over a trained or loaded subword model.
pub struct SubwordTokenizer<M> {
    backend: Backend<M>,
    commands: CommandTokens,
    vocab_size: usize,
}

pub type WordPieceTokenizer = SubwordTokenizer<WordPiece>;
pub type BpeTokenizer = SubwordTokenizer<BPE>;

impl<M: SubwordModel> SubwordTokenizer<M> {
    /// Train a fresh model on `texts`.
    ///
    /// WordPiece models lowercase their input unless `model_type` names a
    /// cased model.
    pub fn fit(texts: &[String], options: &TokenizerOptions) -> DataResult<Self> {
        let layout = CommandTokens::layout(options.pad_token)?;
        let specials: Vec<AddedToken> =
            layout.iter().map(|kind| AddedToken::from(M::special_token(*kind), true)).collect();

        let lowercase = M::LOWERCASE && !options.model_type.contains("-cased");
        let limit_alphabet = (options.character_coverage < 1.0)
            .then(|| coverage_alphabet(texts.iter().map(String::as_str), options.character_coverage).len());
        let vocab_size = options.vocab_size.unwrap_or(M::DEFAULT_VOCAB_SIZE);

        let model = M::train(texts, vocab_size, specials, limit_alphabet, lowercase)?;
        let commands = lookup_commands(|kind| {
            let name = M::special_token(kind);
            Some(model.token_to_id(name).ok_or_else(|| {
                DataError::Tokenizer(format!("trained vocabulary is missing special token {name}"))
            }))
            .transpose()
        })?;
        let vocab_size = model.get_vocab_size();

        Ok(Self { backend: Backend::Fitted { model, lowercase }, commands, vocab_size })
    }

    /// Load a serialized `tokenizer.json`.
    ///
    /// Command tokens are found by their usual names; a vocabulary without an
    /// end-of-sequence token is rejected, other missing ones fall back to it.
    pub fn from_file(path: &Path) -> DataResult<Self> {
        let tokenizer = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| DataError::Tokenizer(format!("failed to load {}: {e}", path.display())))?;

        let commands = lookup_commands(|kind| {
            Ok(pretrained_candidates(kind).iter().find_map(|name| tokenizer.token_to_id(name)))
        })?;
        let vocab_size = tokenizer.get_vocab_size(true);
        tracing::debug!(path = %path.display(), vocab_size, "loaded pretrained tokenizer");

        Ok(Self { backend: Backend::Pretrained(Box::new(tokenizer)), commands, vocab_size })
    }
}

impl<M: SubwordModel> Tokenizer for SubwordTokenizer<M> {
    fn name(&self) -> &'static str {
        M::NAME
    }

    fn encode(&self, text: &str) -> DataResult<Vec<u32>> {
        match &self.backend {
            Backend::Pretrained(tokenizer) => {
                let encoding = tokenizer.encode(text, false).map_err(DataError::tokenizer)?;
                Ok(encoding.get_ids().to_vec())
            }
            Backend::Fitted { model, lowercase } => {
                let mut ids = Vec::new();
                for word in pre_tokenize(text, *lowercase) {
                    let tokens = model.tokenize(&word).map_err(DataError::tokenizer)?;
                    ids.extend(tokens.into_iter().map(|t| t.id));
                }
                Ok(ids)
            }
        }
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn command_tokens(&self) -> &CommandTokens {
        &self.commands
    }
}

fn pretrained_candidates(kind: CommandKind) -> &'static [&'static str] {
    match kind {
        CommandKind::Pad => &["[PAD]", "<pad>", "<|pad|>"],
        CommandKind::Eos => &["[EOS]", "</s>", "<|endoftext|>", "[SEP]"],
        CommandKind::Bos => &["[BOS]", "<s>", "[CLS]"],
        CommandKind::Unk => &["[UNK]", "<unk>"],
        CommandKind::Sep => &["[SEP]", "<sep>", "</s>"],
        CommandKind::Cls => &["[CLS]", "<cls>", "<s>"],
        CommandKind::Mask => &["[MASK]", "<mask>"],
    }
}

/// Resolve every command id; `eos` is required and fills in for the others.
fn lookup_commands(mut find: impl FnMut(CommandKind) -> DataResult<Option<u32>>) -> DataResult<CommandTokens> {
    let eos = find(CommandKind::Eos)?
        .ok_or_else(|| DataError::Tokenizer("vocabulary has no end-of-sequence token".to_string()))?;

    let mut ids = HashMap::new();
    for kind in CommandKind::ALL {
        ids.insert(kind, find(kind)?.unwrap_or(eos));
    }
    Ok(CommandTokens::from_lookup(|kind| ids[&kind]))
}

/// Whitespace split with punctuation broken out into single-char words.
fn pre_tokenize(text: &str, lowercase: bool) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if is_punctuation(ch) {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            words.push(ch.to_string());
        } else if lowercase {
            current.extend(ch.to_lowercase());
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn is_punctuation(ch: char) -> bool {
    ch.is_ascii_punctuation() || (!ch.is_alphanumeric() && !ch.is_whitespace() && !ch.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn corpus() -> Vec<String> {
        [
            "Hello world, hello there.",
            "The world is wide and the sea is deep.",
            "hello hello world world",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }

    #[test]
    fn test_pre_tokenize() {
        assert_eq!(pre_tokenize("Hi, you!", false), vec!["Hi", ",", "you", "!"]);
        assert_eq!(pre_tokenize("  ÄB  c ", true), vec!["äb", "c"]);
    }

    #[test]
    fn test_fit_wordpiece() {
        let tok = WordPieceTokenizer::fit(&corpus(), &TokenizerOptions::default()).unwrap();
        assert_eq!(tok.name(), "WordPieceTokenizer");

        let commands = tok.command_tokens();
        let distinct: HashSet<u32> = CommandKind::ALL.iter().map(|k| commands.get(*k)).collect();
        assert_eq!(distinct.len(), 7);

        let ids = tok.encode("hello world").unwrap();
        assert!(!ids.is_empty());
        assert!(!ids.contains(&commands.unk));
        assert_eq!(tok.encode("HELLO World").unwrap(), ids);
    }

    #[test]
    fn test_cased_wordpiece_keeps_case() {
        let options = TokenizerOptions { model_type: "bert-base-cased".to_string(), ..Default::default() };
        let tok = WordPieceTokenizer::fit(&corpus(), &options).unwrap();
        assert_ne!(tok.encode("Hello").unwrap(), tok.encode("hello").unwrap());
    }

    #[test]
    fn test_fit_bpe() {
        let tok = BpeTokenizer::fit(&corpus(), &TokenizerOptions::default()).unwrap();
        assert_eq!(tok.name(), "BpeTokenizer");
        let ids = tok.encode("the world").unwrap();
        assert!(!ids.is_empty());
        assert!(tok.vocab_size() > 7);
    }

    #[test]
    fn test_load_from_file() {
        let vocab: ahash::AHashMap<String, u32> = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]", "hello"]
            .iter()
            .enumerate()
            .map(|(i, t)| ((*t).to_string(), i as u32))
            .collect();
        let model = WordPiece::builder().vocab(vocab).unk_token("[UNK]".to_string()).build().unwrap();

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tokenizer.json");
        tokenizers::Tokenizer::new(model).save(&path, false).unwrap();

        let tok = WordPieceTokenizer::from_file(&path).unwrap();
        assert_eq!(tok.encode("hello").unwrap(), vec![5]);
        let commands = tok.command_tokens();
        assert_eq!(commands.pad, 0);
        assert_eq!(commands.eos, 3);
        assert_eq!(commands.bos, 2);
        assert_eq!(commands.mask, 4);
    }

    #[test]
    fn test_missing_file() {
        let result = BpeTokenizer::from_file(Path::new("/nonexistent/tokenizer.json"));
        assert!(matches!(result, Err(DataError::Tokenizer(_))));
    }
}
