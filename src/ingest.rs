use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use serde_json::Value;

use crate::error::ValidatorError;

/// Reads a SONG analysis dump: a JSON array of analysis documents, optionally
/// gzip-compressed (`.gz`).
pub fn read_dump(path: &Path) -> Result<Vec<Value>, ValidatorError> {
    let file = File::open(path).map_err(|err| ValidatorError::DumpRead {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    serde_json::from_reader(reader).map_err(|err| ValidatorError::DumpParse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Copies the legacy `experiment.library_strategy` into
/// `experiment.experimental_strategy` when only the former is present.
pub fn normalize_strategy(document: &mut Value) -> bool {
    let Some(experiment) = document
        .get_mut("experiment")
        .and_then(Value::as_object_mut)
    else {
        return false;
    };
    if experiment.contains_key("experimental_strategy") {
        return false;
    }
    let Some(library_strategy) = experiment.get("library_strategy").cloned() else {
        return false;
    };
    experiment.insert("experimental_strategy".to_string(), library_strategy);
    true
}

pub fn document_id(document: &Value) -> Option<&str> {
    document.get("analysisId").and_then(Value::as_str)
}
