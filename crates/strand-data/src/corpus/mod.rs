//! Corpus resolution: named corpora and file parsers.

pub mod delimited;
pub mod json;
pub mod registry;

pub use registry::{CorpusRegistry, FileCorpus, NamedCorpus};

use crate::dataset::{Label, RawRecord, ResolvedDataset};
use crate::error::{DataError, DataResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where a record's label comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelKey {
    Single(String),
    /// Multilabel mode: one numeric column per label (delimited files only).
    Columns(Vec<String>),
}

impl Default for LabelKey {
    fn default() -> Self {
        Self::Single("label".to_string())
    }
}

/// Options forwarded to corpus parsers and named-corpus factories.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderOptions {
    pub text_key: String,
    pub label_key: LabelKey,
    pub prompt_key: String,
    pub delimiter: u8,
    pub loose_json: bool,
    pub binarize_sent: bool,
    pub drop_unlabeled: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            text_key: "text".to_string(),
            label_key: LabelKey::default(),
            prompt_key: "prompt".to_string(),
            delimiter: b',',
            loose_json: false,
            binarize_sent: false,
            drop_unlabeled: false,
        }
    }
}

/// File formats the resolver can parse, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorpusFormat {
    Json,
    Csv,
    Tsv,
}

impl CorpusFormat {
    pub fn from_path(path: &Path) -> DataResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        if ext.starts_with("json") {
            Ok(Self::Json)
        } else if ext == "csv" {
            Ok(Self::Csv)
        } else if ext == "tsv" {
            Ok(Self::Tsv)
        } else {
            Err(DataError::UnsupportedFormat {
                extension: if ext.is_empty() { String::new() } else { format!(".{ext}") },
            })
        }
    }
}

/// Resolve a path or named-corpus identifier into parsed records.
pub fn resolve_corpus(
    id: &str,
    options: &ReaderOptions,
    registry: &CorpusRegistry,
) -> DataResult<ResolvedDataset> {
    if let Some(corpus) = registry.get(id) {
        tracing::debug!(corpus = id, "resolving named corpus");
        return corpus.load(options);
    }
    read_corpus_file(Path::new(id), None, options)
}

/// Parse a corpus file, dispatching on `format` or the file extension.
pub fn read_corpus_file(
    path: &Path,
    format: Option<CorpusFormat>,
    options: &ReaderOptions,
) -> DataResult<ResolvedDataset> {
    let format = match format {
        Some(f) => f,
        None => CorpusFormat::from_path(path)?,
    };

    let records = match format {
        CorpusFormat::Json => {
            if matches!(options.label_key, LabelKey::Columns(_)) {
                return Err(DataError::InvalidConfig(
                    "non_binary_cols is only supported for csv/tsv corpora".to_string(),
                ));
            }
            json::read_json_records(path, options)?
        }
        CorpusFormat::Csv => delimited::read_delimited_records(path, options.delimiter, options)?,
        CorpusFormat::Tsv => delimited::read_delimited_records(path, b'\t', options)?,
    };

    let records = postprocess_labels(path, records, options);
    tracing::debug!(path = %path.display(), records = records.len(), "parsed corpus file");
    Ok(ResolvedDataset::new(records))
}

fn is_unlabeled(record: &RawRecord) -> bool {
    match &record.label {
        None => true,
        Some(label) => label.as_number().is_some_and(|n| (n - -1.0).abs() < f64::EPSILON),
    }
}

/// Apply `drop_unlabeled` and `binarize_sent` to freshly parsed records.
fn postprocess_labels(path: &Path, mut records: Vec<RawRecord>, options: &ReaderOptions) -> Vec<RawRecord> {
    if options.drop_unlabeled {
        let before = records.len();
        records.retain(|r| !is_unlabeled(r));
        let dropped = before - records.len();
        if dropped > 0 {
            tracing::warn!(path = %path.display(), dropped, "dropped unlabeled records");
        }
    }

    if options.binarize_sent {
        let numbers: Vec<f64> = records.iter().filter_map(|r| r.label.as_ref()?.as_number()).collect();
        if let (Some(min), Some(max)) = (
            numbers.iter().copied().reduce(f64::min),
            numbers.iter().copied().reduce(f64::max),
        ) {
            let center = (min + max) / 2.0;
            for record in &mut records {
                if let Some(n) = record.label.as_ref().and_then(Label::as_number) {
                    record.label = Some(Label::Number(if n >= center { 1.0 } else { 0.0 }));
                }
            }
        }
    }

    records
}
