//! Collapses per-sample observations into canonical samples and discrepancies.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::aggregate::{SampleInfo, ValueObservations};
use crate::domain::{NORMAL, TUMOUR};
use crate::fields::TrackedField;

/// The single sequencing experiment of a sample under one strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequencingExperiment {
    pub sequencing_experiment_analysis_id: String,
    #[serde(rename = "matchedNormalSubmitterSampleId")]
    pub matched_normal_submitter_sample_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalSample {
    #[serde(rename = "sampleId")]
    pub sample_id: String,
    #[serde(rename = "analysisId")]
    pub analysis_ids: Vec<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<TrackedField, Option<String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sequencing_experiment: BTreeMap<String, SequencingExperiment>,
}

impl CanonicalSample {
    /// `None` when the field was disagreed on (or not tracked), `Some(None)` when
    /// every analysis left it empty.
    pub fn field(&self, field: TrackedField) -> Option<Option<&str>> {
        self.fields.get(&field).map(|value| value.as_deref())
    }

    pub fn submitter_sample_id(&self) -> Option<&str> {
        self.field(TrackedField::SubmitterSampleId).flatten()
    }

    pub fn tumour_normal_designation(&self) -> Option<&str> {
        self.field(TrackedField::TumourNormalDesignation).flatten()
    }

    pub fn is_tumour(&self) -> bool {
        self.tumour_normal_designation() == Some(TUMOUR)
    }

    pub fn is_normal(&self) -> bool {
        self.tumour_normal_designation() == Some(NORMAL)
    }
}

/// Everything about one sample that could not be collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SampleIssues {
    #[serde(flatten)]
    pub fields: BTreeMap<TrackedField, ValueObservations>,
    /// Strategies submitted more than once, with every analysis id.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sequencing_experiment: BTreeMap<String, Vec<String>>,
}

impl SampleIssues {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.sequencing_experiment.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub samples: BTreeMap<String, CanonicalSample>,
    pub issues: BTreeMap<String, SampleIssues>,
}

pub fn resolve_samples(sample_info: &BTreeMap<String, SampleInfo>) -> Resolution {
    let mut resolution = Resolution::default();

    for (sample_id, info) in sample_info {
        let (sample, issues) = resolve_sample(info);
        if !issues.is_empty() {
            debug!(
                sample_id = %sample_id,
                fields = issues.fields.len(),
                strategies = issues.sequencing_experiment.len(),
                "sample has discrepancies"
            );
            resolution.issues.insert(sample_id.clone(), issues);
        }
        resolution.samples.insert(sample_id.clone(), sample);
    }

    resolution
}

pub fn resolve_sample(info: &SampleInfo) -> (CanonicalSample, SampleIssues) {
    let mut sample = CanonicalSample {
        sample_id: info.sample_id.clone(),
        analysis_ids: info.analysis_ids.clone(),
        fields: BTreeMap::new(),
        sequencing_experiment: BTreeMap::new(),
    };
    let mut issues = SampleIssues::default();

    for (field, observations) in &info.fields {
        let mut values = observations.keys();
        match (values.next(), values.next()) {
            (Some(value), None) => {
                sample.fields.insert(*field, value.canonical());
            }
            (Some(_), Some(_)) => {
                issues.fields.insert(*field, observations.clone());
            }
            (None, _) => {}
        }
    }

    for (strategy, bucket) in &info.sequencing_experiment {
        match bucket.observations.as_slice() {
            [single] => {
                sample.sequencing_experiment.insert(
                    strategy.clone(),
                    SequencingExperiment {
                        sequencing_experiment_analysis_id: single.analysis_id.clone(),
                        matched_normal_submitter_sample_id: single
                            .matched_normal_submitter_sample_id
                            .clone(),
                    },
                );
            }
            [] => {}
            _ => {
                issues
                    .sequencing_experiment
                    .insert(strategy.clone(), bucket.analysis_ids());
            }
        }
    }

    (sample, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::domain::{AnalysisRecord, ObservedValue};
    use crate::fields::default_tracked_fields;

    fn record(analysis_id: &str, strategy: &str, gender: Option<&str>) -> AnalysisRecord {
        serde_json::from_value(serde_json::json!({
            "analysisId": analysis_id,
            "analysisType": {"name": "sequencing_experiment"},
            "experiment": {"experimental_strategy": strategy},
            "studyId": "TEST-CA",
            "samples": [{
                "sampleId": "SA1",
                "submitterSampleId": "T1",
                "matchedNormalSubmitterSampleId": null,
                "specimen": {"tumourNormalDesignation": "Normal"},
                "donor": {"donorId": "DO1", "gender": gender}
            }]
        }))
        .unwrap()
    }

    fn resolve(records: &[AnalysisRecord]) -> Resolution {
        resolve_samples(&aggregate(records, &default_tracked_fields()).samples)
    }

    #[test]
    fn agreeing_fields_collapse() {
        let resolution = resolve(&[
            record("a1", "WGS", Some("Male")),
            record("a2", "WXS", Some("Male")),
        ]);
        let sample = &resolution.samples["SA1"];
        assert_eq!(sample.field(TrackedField::Gender), Some(Some("Male")));
        assert_eq!(sample.submitter_sample_id(), Some("T1"));
        assert!(sample.is_normal());
        assert!(resolution.issues.is_empty());
        assert_eq!(sample.sequencing_experiment.len(), 2);
        assert_eq!(
            sample.sequencing_experiment["WXS"].sequencing_experiment_analysis_id,
            "a2"
        );
    }

    #[test]
    fn empty_fields_resolve_to_null() {
        let resolution = resolve(&[record("a1", "WGS", None), record("a2", "WXS", None)]);
        let sample = &resolution.samples["SA1"];
        assert_eq!(sample.field(TrackedField::Gender), Some(None));
        assert_eq!(sample.field(TrackedField::MatchedNormalSubmitterSampleId), Some(None));
        assert!(resolution.issues.is_empty());

        let json = serde_json::to_value(sample).unwrap();
        assert_eq!(json["gender"], serde_json::Value::Null);
        assert_eq!(json["sampleId"], "SA1");
    }

    #[test]
    fn disagreeing_fields_move_to_issues() {
        let resolution = resolve(&[record("a1", "WGS", Some("Male")), record("a2", "WXS", None)]);
        let sample = &resolution.samples["SA1"];
        assert_eq!(sample.field(TrackedField::Gender), None);

        let gender = &resolution.issues["SA1"].fields[&TrackedField::Gender];
        assert_eq!(gender[&ObservedValue::observe(Some("Male"))], vec!["a1"]);
        assert_eq!(gender[&ObservedValue::observe(None)], vec!["a2"]);

        let json = serde_json::to_value(&resolution.issues["SA1"]).unwrap();
        assert_eq!(json["gender"]["None"], serde_json::json!(["a2"]));
    }

    #[test]
    fn duplicate_strategy_is_a_discrepancy() {
        let resolution = resolve(&[
            record("a2", "WGS", Some("Male")),
            record("a1", "WGS", Some("Male")),
            record("a3", "RNA-Seq", Some("Male")),
        ]);
        let sample = &resolution.samples["SA1"];
        assert!(!sample.sequencing_experiment.contains_key("WGS"));
        assert!(sample.sequencing_experiment.contains_key("RNA-Seq"));
        assert_eq!(
            resolution.issues["SA1"].sequencing_experiment["WGS"],
            vec!["a1", "a2"]
        );
        assert!(resolution.issues["SA1"].fields.is_empty());
    }
}
