use crate::corpus::{LabelKey, ReaderOptions};
use crate::dataset::{Label, RawRecord};
use crate::error::{DataError, DataResult};
use std::path::Path;

/// Read a CSV/TSV corpus with a header row.
///
/// Rows with an empty text cell are skipped. A missing label column leaves
/// records unlabeled; in multilabel mode every listed column must exist and
/// hold numbers.
pub fn read_delimited_records(path: &Path, delimiter: u8, options: &ReaderOptions) -> DataResult<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let text_col = column(&options.text_key).ok_or_else(|| {
        DataError::corpus(path, format!("missing text column {:?}", options.text_key))
    })?;
    let prompt_col = column(&options.prompt_key);

    let label_cols = match &options.label_key {
        LabelKey::Single(key) => LabelColumns::Single(column(key)),
        LabelKey::Columns(keys) => LabelColumns::Multi(
            keys.iter()
                .map(|k| {
                    column(k).ok_or_else(|| DataError::corpus(path, format!("missing label column {k:?}")))
                })
                .collect::<DataResult<Vec<_>>>()?,
        ),
    };

    let mut records = Vec::new();
    for (row_idx, row) in reader.records().enumerate() {
        let row = row?;
        let text = row.get(text_col).unwrap_or("");
        if text.is_empty() {
            continue;
        }

        let label = match &label_cols {
            LabelColumns::Single(None) => None,
            LabelColumns::Single(Some(col)) => row.get(*col).filter(|s| !s.is_empty()).map(parse_label),
            LabelColumns::Multi(cols) => {
                let values = cols
                    .iter()
                    .map(|c| {
                        row.get(*c).and_then(|s| s.trim().parse::<f64>().ok()).ok_or_else(|| {
                            DataError::corpus(path, format!("row {} has a non-numeric label", row_idx + 1))
                        })
                    })
                    .collect::<DataResult<Vec<_>>>()?;
                Some(Label::Vector(values))
            }
        };

        let prompt = prompt_col.and_then(|c| row.get(c)).filter(|s| !s.is_empty()).map(str::to_string);

        records.push(RawRecord { text: text.to_string(), label, prompt });
    }

    Ok(records)
}

enum LabelColumns {
    Single(Option<usize>),
    Multi(Vec<usize>),
}

fn parse_label(cell: &str) -> Label {
    cell.trim().parse::<f64>().map_or_else(|_| Label::Text(cell.to_string()), Label::Number)
}
