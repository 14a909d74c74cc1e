use crate::error::{DataError, DataResult};
use crate::lazy::LazyArrayLoader;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Indexed, read-only collection of items.
///
/// Every stage of the pipeline (sources, combined corpus, split slices, task
/// windows) exposes this contract so stages can be stacked without copying.
pub trait Dataset: Send + Sync {
    type Item;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> DataResult<Self::Item>;
}

/// Stable identifier for an assembled corpus (content hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetId(pub String);

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Label attached to a raw record by a corpus parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Number(f64),
    /// Multilabel rows (one value per `non_binary_cols` column).
    Vector(Vec<f64>),
    Text(String),
}

impl Label {
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Vector(_) => None,
        }
    }
}

/// A single record as produced by a corpus parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub text: String,
    #[serde(default)]
    pub label: Option<Label>,
    #[serde(default)]
    pub prompt: Option<String>,
}

impl RawRecord {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), label: None, prompt: None }
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }
}

/// A single column value: raw text, or a pre-tokenized id sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    Text(String),
    Tokens(Vec<u32>),
}

impl RecordValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Tokens(_) => None,
        }
    }

    /// Length used for length-weighted sampling: UTF-8 bytes for text, ids for
    /// tokens. Matches what the lazy store records, so both paths weigh alike.
    #[must_use]
    pub fn weight(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Tokens(t) => t.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Tokens(t) => t.is_empty(),
        }
    }
}

impl From<&str> for RecordValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RecordValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u32>> for RecordValue {
    fn from(value: Vec<u32>) -> Self {
        Self::Tokens(value)
    }
}

/// Output of the corpus resolver: parsed records in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedDataset {
    records: Vec<RawRecord>,
}

impl ResolvedDataset {
    #[must_use]
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    /// Prompt view. Records without a prompt contribute an empty string.
    #[must_use]
    pub fn prompts(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.prompt.as_deref().unwrap_or("")).collect()
    }

    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.text.as_str()).collect()
    }

    /// Split into index-aligned `(prompts, texts)` columns.
    #[must_use]
    pub fn into_columns(self) -> (Vec<RecordValue>, Vec<RecordValue>) {
        self.records
            .into_iter()
            .map(|r| (RecordValue::Text(r.prompt.unwrap_or_default()), RecordValue::Text(r.text)))
            .unzip()
    }
}

/// One column of a [`PromptTextDataset`].
pub enum Column {
    Memory(Vec<RecordValue>),
    Lazy(LazyArrayLoader),
}

impl Column {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Memory(values) => values.len(),
            Self::Lazy(loader) => loader.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> DataResult<RecordValue> {
        match self {
            Self::Memory(values) => values
                .get(index)
                .cloned()
                .ok_or(DataError::IndexOutOfBounds { index, len: values.len() }),
            Self::Lazy(loader) => loader.get(index),
        }
    }

    /// Sampling weight of element `index` without decoding it when lazy.
    pub fn weight(&self, index: usize) -> DataResult<usize> {
        match self {
            Self::Memory(values) => values
                .get(index)
                .map(RecordValue::weight)
                .ok_or(DataError::IndexOutOfBounds { index, len: values.len() }),
            Self::Lazy(loader) => loader.element_len(index),
        }
    }
}

/// A prompt/text pair as read back from a [`PromptTextDataset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptText {
    pub prompt: RecordValue,
    pub text: RecordValue,
}

/// Two-column dataset every corpus is normalized into before combination.
pub struct PromptTextDataset {
    prompts: Column,
    texts: Column,
}

impl PromptTextDataset {
    /// Build from two columns, enforcing `len(prompts) == len(texts)`.
    pub fn from_columns(prompts: Column, texts: Column) -> DataResult<Self> {
        if prompts.len() != texts.len() {
            return Err(DataError::InvalidConfig(format!(
                "prompt/text columns are not aligned ({} prompts, {} texts)",
                prompts.len(),
                texts.len()
            )));
        }
        Ok(Self { prompts, texts })
    }

    #[must_use]
    pub fn from_resolved(resolved: ResolvedDataset) -> Self {
        let (prompts, texts) = resolved.into_columns();
        Self { prompts: Column::Memory(prompts), texts: Column::Memory(texts) }
    }

    pub fn lazy(prompts: LazyArrayLoader, texts: LazyArrayLoader) -> DataResult<Self> {
        if prompts.len() != texts.len() {
            return Err(DataError::LazyCache(format!(
                "cached prompt/text arrays are not aligned ({} prompts, {} texts)",
                prompts.len(),
                texts.len()
            )));
        }
        Ok(Self { prompts: Column::Lazy(prompts), texts: Column::Lazy(texts) })
    }

    #[must_use]
    pub fn prompts(&self) -> &Column {
        &self.prompts
    }

    #[must_use]
    pub fn texts(&self) -> &Column {
        &self.texts
    }

    #[must_use]
    pub fn is_lazy(&self) -> bool {
        matches!(self.texts, Column::Lazy(_))
    }

    /// Combined prompt + text weight of record `index`.
    pub fn weight(&self, index: usize) -> DataResult<usize> {
        Ok(self.prompts.weight(index)? + self.texts.weight(index)?)
    }
}

impl Dataset for PromptTextDataset {
    type Item = PromptText;

    fn len(&self) -> usize {
        self.texts.len()
    }

    fn get(&self, index: usize) -> DataResult<PromptText> {
        Ok(PromptText { prompt: self.prompts.get(index)?, text: self.texts.get(index)? })
    }
}

/// Hash every prompt/text pair in order into a stable [`DatasetId`].
pub fn dataset_fingerprint<D>(dataset: &D) -> DataResult<DatasetId>
where
    D: Dataset<Item = PromptText> + ?Sized,
{
    let mut hasher = Sha256::new();

    for idx in 0..dataset.len() {
        let item = dataset.get(idx)?;
        hasher.update(serde_json::to_vec(&item.prompt)?);
        hasher.update(b"\t");
        hasher.update(serde_json::to_vec(&item.text)?);
        hasher.update(b"\n");
    }

    Ok(DatasetId(hex::encode(hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved() -> ResolvedDataset {
        ResolvedDataset::new(vec![
            RawRecord::new("first text").with_prompt("q1"),
            RawRecord::new("second text"),
            RawRecord::new("third text").with_label(Label::Number(1.0)),
        ])
    }

    #[test]
    fn test_views_are_index_aligned() {
        let ds = resolved();
        assert_eq!(ds.prompts().len(), ds.texts().len());
        assert_eq!(ds.prompts(), vec!["q1", "", ""]);
        assert_eq!(ds.texts()[2], "third text");
    }

    #[test]
    fn test_prompt_text_dataset_from_resolved() {
        let ds = PromptTextDataset::from_resolved(resolved());
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.prompts().len(), ds.texts().len());
        assert!(!ds.is_lazy());

        let item = ds.get(0).unwrap();
        assert_eq!(item.prompt, RecordValue::from("q1"));
        assert_eq!(item.text, RecordValue::from("first text"));
        assert_eq!(ds.weight(0).unwrap(), 2 + 10);
    }

    #[test]
    fn test_misaligned_columns_are_rejected() {
        let result = PromptTextDataset::from_columns(
            Column::Memory(vec![RecordValue::from("p")]),
            Column::Memory(vec![RecordValue::from("a"), RecordValue::from("b")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_bounds_get() {
        let ds = PromptTextDataset::from_resolved(resolved());
        assert!(matches!(ds.get(3), Err(DataError::IndexOutOfBounds { index: 3, len: 3 })));
    }

    #[test]
    fn test_fingerprint_stable_and_content_sensitive() {
        let a = PromptTextDataset::from_resolved(resolved());
        let b = PromptTextDataset::from_resolved(resolved());
        assert_eq!(dataset_fingerprint(&a).unwrap(), dataset_fingerprint(&b).unwrap());

        let c = PromptTextDataset::from_resolved(ResolvedDataset::new(vec![RawRecord::new("other")]));
        assert_ne!(dataset_fingerprint(&a).unwrap(), dataset_fingerprint(&c).unwrap());
    }

    #[test]
    fn test_label_as_number() {
        assert_eq!(Label::Number(2.0).as_number(), Some(2.0));
        assert_eq!(Label::Text(" 3 ".to_string()).as_number(), Some(3.0));
        assert_eq!(Label::Vector(vec![1.0]).as_number(), None);
    }
}
