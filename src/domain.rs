use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ValidatorError;

/// String form of a missing value. Two absent observations compare equal.
pub const NO_VALUE_MARKER: &str = "None";

pub const TUMOUR: &str = "Tumour";
pub const NORMAL: &str = "Normal";

pub const SEQUENCING_EXPERIMENT: &str = "sequencing_experiment";
pub const RNA_SEQUENCING_EXPERIMENT: &str = "rna_sequencing_experiment";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramId(String);

impl ProgramId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProgramId {
    type Err = ValidatorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        if normalized.is_empty() || normalized.chars().any(char::is_whitespace) {
            return Err(ValidatorError::InvalidProgramId(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DonorId(String);

impl DonorId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DonorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DonorId {
    type Err = ValidatorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = !normalized.is_empty()
            && !normalized.chars().any(char::is_whitespace)
            && !normalized.contains(['/', '\\']);
        if !is_valid {
            return Err(ValidatorError::InvalidDonorId(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

/// One SONG analysis document as stored in the index `_source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub analysis_id: String,
    #[serde(default)]
    pub analysis_type: Option<AnalysisType>,
    #[serde(default)]
    pub experiment: Option<Experiment>,
    #[serde(default)]
    pub samples: Vec<Sample>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub study_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisType {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    #[serde(default)]
    pub experimental_strategy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub sample_id: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub submitter_sample_id: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub sample_type: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub matched_normal_submitter_sample_id: Option<String>,
    #[serde(default)]
    pub specimen: Option<Specimen>,
    #[serde(default)]
    pub donor: Option<Donor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specimen {
    #[serde(default, deserialize_with = "scalar_string")]
    pub specimen_id: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub specimen_type: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub tumour_normal_designation: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub specimen_tissue_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donor {
    #[serde(default, deserialize_with = "scalar_string")]
    pub donor_id: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub gender: Option<String>,
}

/// Reads a compared attribute from any JSON value. Strings are kept as is,
/// other values in their JSON text form, so `1` and `"1"` agree.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(value)) => Some(value),
        Some(other) => Some(other.to_string()),
    })
}

/// Why a record was kept out of reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    SampleCount { count: usize },
    MissingStrategy,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::SampleCount { count } => {
                write!(f, "expected exactly one sample, found {count}")
            }
            Rejection::MissingStrategy => {
                write!(f, "sequencing experiment without experimental_strategy")
            }
        }
    }
}

impl AnalysisRecord {
    pub fn analysis_type_name(&self) -> Option<&str> {
        self.analysis_type
            .as_ref()
            .and_then(|value| value.name.as_deref())
    }

    pub fn is_sequencing_experiment(&self) -> bool {
        matches!(
            self.analysis_type_name(),
            Some(SEQUENCING_EXPERIMENT | RNA_SEQUENCING_EXPERIMENT)
        )
    }

    pub fn experimental_strategy(&self) -> Option<&str> {
        self.experiment
            .as_ref()
            .and_then(|value| value.experimental_strategy.as_deref())
    }

    /// The record's only sample. Records carrying zero or several samples are
    /// rejected instead of being read at index 0.
    pub fn sample(&self) -> Result<&Sample, Rejection> {
        match self.samples.as_slice() {
            [sample] => Ok(sample),
            other => Err(Rejection::SampleCount { count: other.len() }),
        }
    }

    /// Checks every shape requirement reconciliation relies on.
    pub fn check(&self) -> Result<(), Rejection> {
        self.sample()?;
        if self.is_sequencing_experiment() && self.experimental_strategy().is_none() {
            return Err(Rejection::MissingStrategy);
        }
        Ok(())
    }
}

/// A field value in the string form used for agreement checks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ObservedValue(String);

impl ObservedValue {
    pub fn observe(raw: Option<&str>) -> Self {
        Self(raw.unwrap_or(NO_VALUE_MARKER).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical form: the marker maps back to `None`.
    pub fn canonical(&self) -> Option<String> {
        (self.0 != NO_VALUE_MARKER).then(|| self.0.clone())
    }
}

impl fmt::Display for ObservedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_donor_id_trims() {
        let id: DonorId = " DO250183 ".parse().unwrap();
        assert_eq!(id.as_str(), "DO250183");
    }

    #[test]
    fn parse_donor_id_invalid() {
        let err = "DO 1".parse::<DonorId>().unwrap_err();
        assert_matches!(err, ValidatorError::InvalidDonorId(_));
        let err = "../etc".parse::<DonorId>().unwrap_err();
        assert_matches!(err, ValidatorError::InvalidDonorId(_));
    }

    #[test]
    fn parse_program_id_invalid() {
        let err = "".parse::<ProgramId>().unwrap_err();
        assert_matches!(err, ValidatorError::InvalidProgramId(_));
    }

    #[test]
    fn observed_value_marker_round_trip() {
        let absent = ObservedValue::observe(None);
        assert_eq!(absent.as_str(), "None");
        assert_eq!(absent.canonical(), None);
        assert_eq!(absent, ObservedValue::observe(Some("None")));

        let present = ObservedValue::observe(Some("Male"));
        assert_eq!(present.canonical().as_deref(), Some("Male"));
    }

    #[test]
    fn deserialize_song_analysis() {
        let raw = r#"{
            "analysisId": "a1",
            "analysisType": {"name": "sequencing_experiment", "version": 6},
            "experiment": {"experimental_strategy": "WGS", "platform": "ILLUMINA"},
            "studyId": "TEST-CA",
            "samples": [{
                "sampleId": "SA1",
                "submitterSampleId": "T1",
                "sampleType": "Total DNA",
                "matchedNormalSubmitterSampleId": "N1",
                "specimen": {"specimenId": "SP1", "tumourNormalDesignation": "Tumour"},
                "donor": {"donorId": "DO1", "gender": "Female"}
            }]
        }"#;
        let record: AnalysisRecord = serde_json::from_str(raw).unwrap();
        assert!(record.is_sequencing_experiment());
        assert_eq!(record.experimental_strategy(), Some("WGS"));
        let sample = record.sample().unwrap();
        assert_eq!(sample.sample_id, "SA1");
        assert_eq!(
            sample.specimen.as_ref().unwrap().specimen_type,
            None,
            "missing nested fields default to None"
        );
        assert!(record.check().is_ok());
    }

    #[test]
    fn non_string_attributes_are_stringified() {
        let record: AnalysisRecord = serde_json::from_str(
            r#"{"analysisId": "a1", "studyId": "TEST-CA",
                "samples": [{
                    "sampleId": "SA1",
                    "submitterSampleId": 42,
                    "matchedNormalSubmitterSampleId": null,
                    "donor": {"donorId": "DO1", "gender": true}
                }]}"#,
        )
        .unwrap();
        let sample = record.sample().unwrap();
        assert_eq!(sample.submitter_sample_id.as_deref(), Some("42"));
        assert_eq!(sample.matched_normal_submitter_sample_id, None);
        assert_eq!(sample.donor.as_ref().unwrap().gender.as_deref(), Some("true"));
    }

    #[test]
    fn reject_multi_sample_and_strategyless_records() {
        let mut record: AnalysisRecord = serde_json::from_str(
            r#"{"analysisId": "a1", "analysisType": {"name": "rna_sequencing_experiment"},
                "samples": [{"sampleId": "SA1"}]}"#,
        )
        .unwrap();
        assert_eq!(record.check(), Err(Rejection::MissingStrategy));

        record.samples.clear();
        assert_eq!(record.check(), Err(Rejection::SampleCount { count: 0 }));
    }
}
