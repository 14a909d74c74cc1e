use crate::dataset::RecordValue;
use crate::error::{DataError, DataResult};
use crate::lazy::layout::{LazyDataType, LazyLayout};
use crate::lazy::store::{LazyIndex, ValueKind};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// How a cached data file is brought into the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Memory-map the data file; pages are read on access.
    #[default]
    MemoryMapped,
    /// Read the whole data file into memory.
    Buffered,
}

enum Storage {
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl Storage {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Mapped(mmap) => mmap,
            Self::Buffered(buf) => buf,
        }
    }
}

/// Read-only view over one cached column.
///
/// Element access decodes storage bytes back into plain [`RecordValue`]s.
pub struct LazyArrayLoader {
    storage: Storage,
    kind: ValueKind,
    /// Element offsets; `offsets[i]..offsets[i + 1]` spans element `i`.
    offsets: Vec<usize>,
}

impl LazyArrayLoader {
    pub fn open(path: &Path, data_type: LazyDataType, mode: LoadMode) -> DataResult<Self> {
        let layout = LazyLayout::for_corpus_path(path);
        let index_path = layout.index_path(data_type);
        let index: LazyIndex = serde_json::from_slice(&std::fs::read(&index_path).map_err(|e| {
            DataError::LazyCache(format!("failed to read {}: {e}", index_path.display()))
        })?)?;

        let mut offsets = Vec::with_capacity(index.lens.len() + 1);
        let mut total = 0usize;
        offsets.push(0);
        for len in &index.lens {
            total += *len as usize;
            offsets.push(total);
        }

        let data_path = layout.data_path(data_type);
        let storage = open_storage(&data_path, mode)?;
        let expected = total * index.kind.element_size();
        if storage.bytes().len() != expected {
            return Err(DataError::LazyCache(format!(
                "{} holds {} bytes but its index describes {expected}",
                data_path.display(),
                storage.bytes().len()
            )));
        }

        Ok(Self { storage, kind: index.kind, offsets })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Stored length of every element (bytes for text, ids for tokens).
    #[must_use]
    pub fn lens(&self) -> Vec<usize> {
        self.offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    pub fn element_len(&self, index: usize) -> DataResult<usize> {
        let (start, end) = self.span(index)?;
        Ok(end - start)
    }

    pub fn get(&self, index: usize) -> DataResult<RecordValue> {
        let (start, end) = self.span(index)?;
        let size = self.kind.element_size();
        let bytes = &self.storage.bytes()[start * size..end * size];

        match self.kind {
            ValueKind::Text => std::str::from_utf8(bytes)
                .map(|s| RecordValue::Text(s.to_string()))
                .map_err(|e| DataError::LazyCache(format!("element {index} is not valid UTF-8: {e}"))),
            ValueKind::Tokens => Ok(RecordValue::Tokens(
                bytes
                    .chunks_exact(4)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            )),
        }
    }

    fn span(&self, index: usize) -> DataResult<(usize, usize)> {
        if index >= self.len() {
            return Err(DataError::IndexOutOfBounds { index, len: self.len() });
        }
        Ok((self.offsets[index], self.offsets[index + 1]))
    }
}

#[allow(unsafe_code)]
fn open_storage(path: &Path, mode: LoadMode) -> DataResult<Storage> {
    let file = File::open(path)
        .map_err(|e| DataError::LazyCache(format!("failed to open {}: {e}", path.display())))?;

    if mode == LoadMode::Buffered || file.metadata()?.len() == 0 {
        return Ok(Storage::Buffered(std::fs::read(path)?));
    }

    // SAFETY: cache files are never written once materialized; the map is read-only.
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(Storage::Mapped(mmap))
}
