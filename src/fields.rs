//! Sample attributes compared across analyses.
//!
//! Each variant pairs a field name with a typed accessor over [`AnalysisRecord`].
//! The dotted paths mirror the document layout in the index and are only used for
//! display and for parsing a configured field list.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::domain::{AnalysisRecord, ObservedValue, Sample};
use crate::error::ValidatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TrackedField {
    #[serde(rename = "submitterSampleId")]
    SubmitterSampleId,
    #[serde(rename = "sampleType")]
    SampleType,
    #[serde(rename = "matchedNormalSubmitterSampleId")]
    MatchedNormalSubmitterSampleId,
    #[serde(rename = "specimenId")]
    SpecimenId,
    #[serde(rename = "specimenType")]
    SpecimenType,
    #[serde(rename = "tumourNormalDesignation")]
    TumourNormalDesignation,
    #[serde(rename = "specimenTissueSource")]
    SpecimenTissueSource,
    #[serde(rename = "donorId")]
    DonorId,
    #[serde(rename = "gender")]
    Gender,
    #[serde(rename = "studyId")]
    StudyId,
}

impl TrackedField {
    pub const ALL: [TrackedField; 10] = [
        TrackedField::SubmitterSampleId,
        TrackedField::SampleType,
        TrackedField::MatchedNormalSubmitterSampleId,
        TrackedField::SpecimenId,
        TrackedField::SpecimenType,
        TrackedField::TumourNormalDesignation,
        TrackedField::SpecimenTissueSource,
        TrackedField::DonorId,
        TrackedField::Gender,
        TrackedField::StudyId,
    ];

    /// Fields the tumour/normal pairing reads from canonical samples.
    pub const PAIRING: [TrackedField; 2] = [
        TrackedField::SubmitterSampleId,
        TrackedField::TumourNormalDesignation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TrackedField::SubmitterSampleId => "submitterSampleId",
            TrackedField::SampleType => "sampleType",
            TrackedField::MatchedNormalSubmitterSampleId => "matchedNormalSubmitterSampleId",
            TrackedField::SpecimenId => "specimenId",
            TrackedField::SpecimenType => "specimenType",
            TrackedField::TumourNormalDesignation => "tumourNormalDesignation",
            TrackedField::SpecimenTissueSource => "specimenTissueSource",
            TrackedField::DonorId => "donorId",
            TrackedField::Gender => "gender",
            TrackedField::StudyId => "studyId",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            TrackedField::SubmitterSampleId => "samples.submitterSampleId",
            TrackedField::SampleType => "samples.sampleType",
            TrackedField::MatchedNormalSubmitterSampleId => {
                "samples.matchedNormalSubmitterSampleId"
            }
            TrackedField::SpecimenId => "samples.specimen.specimenId",
            TrackedField::SpecimenType => "samples.specimen.specimenType",
            TrackedField::TumourNormalDesignation => "samples.specimen.tumourNormalDesignation",
            TrackedField::SpecimenTissueSource => "samples.specimen.specimenTissueSource",
            TrackedField::DonorId => "samples.donor.donorId",
            TrackedField::Gender => "samples.donor.gender",
            TrackedField::StudyId => "studyId",
        }
    }

    /// Reads the field from `record`, whose single sample is `sample`.
    pub fn observe(self, record: &AnalysisRecord, sample: &Sample) -> ObservedValue {
        let specimen = sample.specimen.as_ref();
        let donor = sample.donor.as_ref();
        let raw = match self {
            TrackedField::SubmitterSampleId => sample.submitter_sample_id.as_deref(),
            TrackedField::SampleType => sample.sample_type.as_deref(),
            TrackedField::MatchedNormalSubmitterSampleId => {
                sample.matched_normal_submitter_sample_id.as_deref()
            }
            TrackedField::SpecimenId => specimen.and_then(|s| s.specimen_id.as_deref()),
            TrackedField::SpecimenType => specimen.and_then(|s| s.specimen_type.as_deref()),
            TrackedField::TumourNormalDesignation => {
                specimen.and_then(|s| s.tumour_normal_designation.as_deref())
            }
            TrackedField::SpecimenTissueSource => {
                specimen.and_then(|s| s.specimen_tissue_source.as_deref())
            }
            TrackedField::DonorId => donor.and_then(|d| d.donor_id.as_deref()),
            TrackedField::Gender => donor.and_then(|d| d.gender.as_deref()),
            TrackedField::StudyId => record.study_id.as_deref(),
        };
        ObservedValue::observe(raw)
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for TrackedField {
    type Err = ValidatorError;

    /// Accepts either the dotted document path or the bare field name.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        TrackedField::ALL
            .into_iter()
            .find(|field| field.path() == trimmed || field.name() == trimmed)
            .ok_or_else(|| ValidatorError::UnknownFieldPath(value.to_string()))
    }
}

pub fn default_tracked_fields() -> Vec<TrackedField> {
    TrackedField::ALL.to_vec()
}
