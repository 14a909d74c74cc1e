use crate::dataset::RecordValue;
use crate::error::{DataError, DataResult};
use crate::lazy::layout::{LazyDataType, LazyLayout};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Storage encoding of a cached column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// UTF-8 bytes; lengths are byte counts.
    Text,
    /// Little-endian `u32` ids; lengths are element counts.
    Tokens,
}

impl ValueKind {
    #[must_use]
    pub fn element_size(self) -> usize {
        match self {
            Self::Text => 1,
            Self::Tokens => 4,
        }
    }
}

/// Length index written next to every data file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LazyIndex {
    pub kind: ValueKind,
    pub lens: Vec<u64>,
    pub created_at: DateTime<Utc>,
}

/// Whether the cache entry for `(path, data_type)` is present.
pub fn exists_lazy(path: &Path, data_type: LazyDataType) -> bool {
    let layout = LazyLayout::for_corpus_path(path);
    layout.data_path(data_type).is_file() && layout.index_path(data_type).is_file()
}

/// Write `values` as the `data_type` cache entry of the corpus at `path`.
///
/// The length index is written after the data file, so its presence marks a
/// finished write. Concurrent writers for the same path are not coordinated.
pub fn make_lazy(path: &Path, values: &[RecordValue], data_type: LazyDataType) -> DataResult<()> {
    let layout = LazyLayout::for_corpus_path(path);
    layout.ensure_dir()?;

    let kind = column_kind(values, data_type)?;
    let mut lens = Vec::with_capacity(values.len());

    let mut writer = BufWriter::new(File::create(layout.data_path(data_type))?);
    for value in values {
        match value {
            RecordValue::Text(s) => {
                writer.write_all(s.as_bytes())?;
                lens.push(s.len() as u64);
            }
            RecordValue::Tokens(ids) => {
                for id in ids {
                    writer.write_all(&id.to_le_bytes())?;
                }
                lens.push(ids.len() as u64);
            }
        }
    }
    writer.flush()?;

    let index = LazyIndex { kind, lens, created_at: Utc::now() };
    std::fs::write(layout.index_path(data_type), serde_json::to_vec(&index)?)?;

    tracing::debug!(
        path = %layout.data_path(data_type).display(),
        records = values.len(),
        "wrote lazy cache entry"
    );
    Ok(())
}

fn column_kind(values: &[RecordValue], data_type: LazyDataType) -> DataResult<ValueKind> {
    let mut kind = None;
    for value in values {
        let this = match value {
            RecordValue::Text(_) => ValueKind::Text,
            RecordValue::Tokens(_) => ValueKind::Tokens,
        };
        match kind {
            None => kind = Some(this),
            Some(k) if k != this => {
                return Err(DataError::LazyCache(format!(
                    "{data_type} column mixes text and token values"
                )));
            }
            Some(_) => {}
        }
    }
    Ok(kind.unwrap_or(ValueKind::Text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_exists_lazy_per_data_type() {
        let temp = TempDir::new().unwrap();
        let corpus = temp.path().join("corpus.json");

        assert!(!exists_lazy(&corpus, LazyDataType::Prompt));
        make_lazy(&corpus, &[RecordValue::from("p")], LazyDataType::Prompt).unwrap();
        assert!(exists_lazy(&corpus, LazyDataType::Prompt));
        assert!(!exists_lazy(&corpus, LazyDataType::Text));
    }

    #[test]
    fn test_index_records_byte_and_element_lengths() {
        let temp = TempDir::new().unwrap();
        let corpus = temp.path().join("corpus.json");
        make_lazy(&corpus, &[RecordValue::from("héllo"), RecordValue::from("")], LazyDataType::Text)
            .unwrap();
        make_lazy(&corpus, &[RecordValue::from(vec![1, 2, 3]), RecordValue::from(vec![])], LazyDataType::Prompt)
            .unwrap();

        let layout = LazyLayout::for_corpus_path(&corpus);
        let text: LazyIndex =
            serde_json::from_slice(&std::fs::read(layout.index_path(LazyDataType::Text)).unwrap()).unwrap();
        assert_eq!(text.kind, ValueKind::Text);
        assert_eq!(text.lens, vec![6, 0]);

        let prompt: LazyIndex =
            serde_json::from_slice(&std::fs::read(layout.index_path(LazyDataType::Prompt)).unwrap()).unwrap();
        assert_eq!(prompt.kind, ValueKind::Tokens);
        assert_eq!(prompt.lens, vec![3, 0]);
        assert_eq!(std::fs::metadata(layout.data_path(LazyDataType::Prompt)).unwrap().len(), 12);
    }

    #[test]
    fn test_mixed_column_rejected() {
        let temp = TempDir::new().unwrap();
        let corpus = temp.path().join("corpus.json");
        let values = vec![RecordValue::from("a"), RecordValue::from(vec![1])];
        assert!(make_lazy(&corpus, &values, LazyDataType::Text).is_err());
    }
}
