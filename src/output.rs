use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::app::{IngestResult, ValidateResult};
use crate::error::ValidatorError;
use crate::reconcile::DonorReport;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_validate(result: &ValidateResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_ingest(result: &IngestResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// Writes per-donor files into an output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    root: Utf8PathBuf,
}

impl ReportWriter {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn report_path(&self, donor_id: &str) -> Utf8PathBuf {
        self.root.join(format!("{donor_id}.validation.json"))
    }

    pub fn analyses_path(&self, donor_id: &str) -> Utf8PathBuf {
        self.root.join(format!("{donor_id}.analyses.json"))
    }

    pub fn aggregations_path(&self, donor_id: &str) -> Utf8PathBuf {
        self.root.join(format!("{donor_id}.aggs.json"))
    }

    pub fn write_report(&self, report: &DonorReport) -> Result<Utf8PathBuf, ValidatorError> {
        let path = self.report_path(report.donor_id.as_str());
        write_json_atomic(&path, report)?;
        Ok(path)
    }

    pub fn write_debug_dump<A: Serialize, G: Serialize>(
        &self,
        donor_id: &str,
        analyses: &A,
        aggregations: &G,
    ) -> Result<(), ValidatorError> {
        write_json_atomic(&self.analyses_path(donor_id), analyses)?;
        write_json_atomic(&self.aggregations_path(donor_id), aggregations)
    }
}

/// Serializes `value` next to `path` and renames it into place.
pub fn write_json_atomic<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), ValidatorError> {
    let parent = path
        .parent()
        .ok_or_else(|| ValidatorError::Filesystem(format!("invalid output path {path}")))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| ValidatorError::Filesystem(err.to_string()))?;
    let mut content = serde_json::to_vec_pretty(value)
        .map_err(|err| ValidatorError::Filesystem(err.to_string()))?;
    content.push(b'\n');
    let mut temp = tempfile::Builder::new()
        .prefix(".song-validator")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| ValidatorError::Filesystem(err.to_string()))?;
    temp.write_all(&content)
        .map_err(|err| ValidatorError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| ValidatorError::Filesystem(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let writer = ReportWriter::new(Utf8PathBuf::from("out"));
        assert!(writer.report_path("DO1").ends_with("DO1.validation.json"));
        assert!(writer.analyses_path("DO1").ends_with("DO1.analyses.json"));
        assert!(writer.aggregations_path("DO1").ends_with("DO1.aggs.json"));
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().join("nested")).unwrap();
        let path = root.join("value.json");

        write_json_atomic(&path, &serde_json::json!({"n": 1})).unwrap();
        write_json_atomic(&path, &serde_json::json!({"n": 2})).unwrap();

        let content = fs::read_to_string(path.as_std_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["n"], 2);
        assert_eq!(fs::read_dir(root.as_std_path()).unwrap().count(), 1);
    }
}
