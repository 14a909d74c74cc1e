use crate::corpus::{LabelKey, ReaderOptions};
use crate::dataset::{Label, RawRecord};
use crate::error::{DataError, DataResult};
use serde_json::Value;
use std::path::Path;

/// Read a JSON corpus.
///
/// With `loose_json` the file holds one object per line; otherwise it is a
/// single JSON array of objects.
pub fn read_json_records(path: &Path, options: &ReaderOptions) -> DataResult<Vec<RawRecord>> {
    let contents = std::fs::read_to_string(path)?;

    let objects: Vec<Value> = if options.loose_json {
        let mut out = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let value = serde_json::from_str(line).map_err(|e| {
                DataError::corpus(path, format!("failed to parse json line {}: {}", idx + 1, e))
            })?;
            out.push(value);
        }
        out
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| DataError::corpus(path, format!("expected a json array of records: {e}")))?
    };

    objects
        .iter()
        .enumerate()
        .map(|(idx, obj)| record_from_json(path, idx, obj, options))
        .collect()
}

fn record_from_json(path: &Path, idx: usize, obj: &Value, options: &ReaderOptions) -> DataResult<RawRecord> {
    let text = match obj.get(&options.text_key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => {
            return Err(DataError::corpus(
                path,
                format!("record {idx} has no {:?} field", options.text_key),
            ));
        }
        Some(other) => other.to_string(),
    };

    let prompt = match obj.get(&options.prompt_key) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    };

    let label = match &options.label_key {
        LabelKey::Single(key) => obj.get(key).and_then(label_from_json),
        LabelKey::Columns(_) => None,
    };

    Ok(RawRecord { text, label, prompt })
}

fn label_from_json(value: &Value) -> Option<Label> {
    match value {
        Value::Number(n) => n.as_f64().map(Label::Number),
        Value::String(s) => Some(Label::Text(s.clone())),
        Value::Bool(b) => Some(Label::Number(if *b { 1.0 } else { 0.0 })),
        Value::Array(items) => items.iter().map(Value::as_f64).collect::<Option<Vec<_>>>().map(Label::Vector),
        Value::Null | Value::Object(_) => None,
    }
}
