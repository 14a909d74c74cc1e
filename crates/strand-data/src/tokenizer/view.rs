use crate::dataset::{Dataset, RecordValue};
use crate::error::DataResult;
use crate::split::SplitView;
use crate::tokenizer::{SharedTokenizer, Tokenizer};

/// One tokenized record: prompt ids followed by text ids.
///
/// `loss_mask` is index-aligned with `tokens`: 0 over the prompt, 1 over the
/// text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub tokens: Vec<u32>,
    pub loss_mask: Vec<u8>,
}

impl Document {
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Split slice read back through the shared tokenizer.
#[derive(Clone)]
pub struct TokenizedView {
    split: SplitView,
    tokenizer: SharedTokenizer,
}

impl TokenizedView {
    #[must_use]
    pub fn new(split: SplitView, tokenizer: SharedTokenizer) -> Self {
        Self { split, tokenizer }
    }

    #[must_use]
    pub fn tokenizer(&self) -> &SharedTokenizer {
        &self.tokenizer
    }

    #[must_use]
    pub fn split(&self) -> &SplitView {
        &self.split
    }

    /// Untokenized length of record `index`, used for length-weighted sampling.
    pub fn weight(&self, index: usize) -> DataResult<usize> {
        self.split.weight(index)
    }

    /// Raw text column of record `index`.
    pub fn raw_text(&self, index: usize) -> DataResult<RecordValue> {
        Ok(self.split.get(index)?.text)
    }

    /// Text of record `index` as tokenized sentences, empty ones dropped.
    ///
    /// Pre-tokenized records form a single sentence.
    pub fn sentences(&self, index: usize, presplit: bool) -> DataResult<Vec<Vec<u32>>> {
        let mut sentences = Vec::new();
        match self.raw_text(index)? {
            RecordValue::Text(text) => {
                for sentence in split_sentences(&text, presplit) {
                    let ids = self.tokenizer.encode(sentence)?;
                    if !ids.is_empty() {
                        sentences.push(ids);
                    }
                }
            }
            RecordValue::Tokens(ids) if ids.is_empty() => {}
            RecordValue::Tokens(ids) => sentences.push(ids),
        }
        Ok(sentences)
    }

    pub fn encode_value(&self, value: &RecordValue) -> DataResult<Vec<u32>> {
        match value {
            RecordValue::Text(text) if text.is_empty() => Ok(Vec::new()),
            RecordValue::Text(text) => self.tokenizer.encode(text),
            RecordValue::Tokens(ids) => Ok(ids.clone()),
        }
    }
}

impl Dataset for TokenizedView {
    type Item = Document;

    fn len(&self) -> usize {
        self.split.len()
    }

    fn get(&self, index: usize) -> DataResult<Document> {
        let record = self.split.get(index)?;
        let mut tokens = self.encode_value(&record.prompt)?;
        let prompt_len = tokens.len();
        tokens.extend(self.encode_value(&record.text)?);

        let mut loss_mask = vec![0u8; prompt_len];
        loss_mask.resize(tokens.len(), 1);
        Ok(Document { tokens, loss_mask })
    }
}

const SENTENCE_END: [char; 6] = ['.', '!', '?', '。', '！', '？'];

/// Split on newlines, and after sentence-final punctuation unless `presplit`.
pub(crate) fn split_sentences(text: &str, presplit: bool) -> Vec<&str> {
    let mut sentences = Vec::new();
    for line in text.split('\n') {
        if presplit {
            sentences.push(line.trim());
            continue;
        }
        let mut start = 0;
        for (idx, ch) in line.char_indices() {
            if SENTENCE_END.contains(&ch) {
                let end = idx + ch.len_utf8();
                sentences.push(line[start..end].trim());
                start = end;
            }
        }
        sentences.push(line[start..].trim());
    }
    sentences.retain(|s| !s.is_empty());
    sentences
}
