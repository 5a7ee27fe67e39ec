use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::record::FunctionRecord;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON array of function records, found {found}")]
    NotAnArray { found: &'static str },
    #[error("record #{index} is not a valid function record: {source}")]
    InvalidRecord {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read dataset file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parses an uploaded dataset. Only a top-level array of function records is
/// accepted.
pub fn parse_records(raw: &str) -> Result<Vec<FunctionRecord>, DatasetError> {
    let parsed: Value = serde_json::from_str(raw)?;
    let Value::Array(entries) = parsed else {
        return Err(DatasetError::NotAnArray {
            found: value_kind(&parsed),
        });
    };

    let mut records = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let record = FunctionRecord::deserialize(entry)
            .map_err(|source| DatasetError::InvalidRecord { index, source })?;
        records.push(record);
    }

    Ok(records)
}

pub fn load_records_file(path: &Path) -> Result<Vec<FunctionRecord>, DatasetError> {
    let raw = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(&raw)
}
