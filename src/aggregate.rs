//! Folds a donor's analyses into per-sample observations.
//!
//! Nothing is collapsed here: every observation keeps the analysis ids that made
//! it, so the resolver can report exactly which submissions disagree.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::warn;

use crate::domain::{AnalysisRecord, ObservedValue, Rejection, Sample};
use crate::fields::TrackedField;

/// Observed value to the analysis ids that reported it.
pub type ValueObservations = BTreeMap<ObservedValue, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequencingObservation {
    pub analysis_id: String,
    pub matched_normal_submitter_sample_id: Option<String>,
}

/// Sequencing experiments of one sample under one strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StrategyBucket {
    pub observations: Vec<SequencingObservation>,
}

impl StrategyBucket {
    pub fn analysis_ids(&self) -> Vec<String> {
        self.observations
            .iter()
            .map(|obs| obs.analysis_id.clone())
            .collect()
    }

    pub fn matched_normal_submitter_sample_ids(&self) -> Vec<Option<String>> {
        self.observations
            .iter()
            .map(|obs| obs.matched_normal_submitter_sample_id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleInfo {
    pub sample_id: String,
    pub analysis_ids: Vec<String>,
    pub fields: BTreeMap<TrackedField, ValueObservations>,
    pub sequencing_experiment: BTreeMap<String, StrategyBucket>,
}

impl SampleInfo {
    fn new(sample_id: &str) -> Self {
        Self {
            sample_id: sample_id.to_string(),
            analysis_ids: Vec::new(),
            fields: BTreeMap::new(),
            sequencing_experiment: BTreeMap::new(),
        }
    }

    fn observe_fields(
        &mut self,
        record: &AnalysisRecord,
        sample: &Sample,
        fields: &BTreeSet<TrackedField>,
    ) {
        self.analysis_ids.push(record.analysis_id.clone());
        for field in fields {
            self.fields
                .entry(*field)
                .or_default()
                .entry(field.observe(record, sample))
                .or_default()
                .push(record.analysis_id.clone());
        }
    }

    fn observe_sequencing(&mut self, record: &AnalysisRecord, sample: &Sample) {
        if !record.is_sequencing_experiment() {
            return;
        }
        let Some(strategy) = record.experimental_strategy() else {
            return;
        };
        self.sequencing_experiment
            .entry(strategy.to_string())
            .or_default()
            .observations
            .push(SequencingObservation {
                analysis_id: record.analysis_id.clone(),
                matched_normal_submitter_sample_id: sample
                    .matched_normal_submitter_sample_id
                    .clone(),
            });
    }

    fn sort(&mut self) {
        self.analysis_ids.sort();
        for observations in self.fields.values_mut() {
            for ids in observations.values_mut() {
                ids.sort();
            }
        }
        for bucket in self.sequencing_experiment.values_mut() {
            bucket
                .observations
                .sort_by(|a, b| a.analysis_id.cmp(&b.analysis_id));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedAnalysis {
    pub analysis_id: String,
    #[serde(flatten)]
    pub rejection: Rejection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    pub samples: BTreeMap<String, SampleInfo>,
    pub rejected: Vec<RejectedAnalysis>,
}

/// Groups `records` by sample id, recording every tracked field and every
/// sequencing experiment. The pairing fields are always recorded. Lists are
/// sorted so the result does not depend on the order the records arrived in.
pub fn aggregate(records: &[AnalysisRecord], fields: &[TrackedField]) -> Aggregation {
    let fields: BTreeSet<TrackedField> = fields
        .iter()
        .copied()
        .chain(TrackedField::PAIRING)
        .collect();
    let mut aggregation = Aggregation::default();

    for record in records {
        if let Err(rejection) = record.check() {
            warn!(analysis_id = %record.analysis_id, %rejection, "analysis rejected");
            aggregation.rejected.push(RejectedAnalysis {
                analysis_id: record.analysis_id.clone(),
                rejection,
            });
            continue;
        }
        let Ok(sample) = record.sample() else {
            continue;
        };

        let info = aggregation
            .samples
            .entry(sample.sample_id.clone())
            .or_insert_with(|| SampleInfo::new(&sample.sample_id));
        info.observe_fields(record, sample, &fields);
        info.observe_sequencing(record, sample);
    }

    for info in aggregation.samples.values_mut() {
        info.sort();
    }
    aggregation
        .rejected
        .sort_by(|a, b| a.analysis_id.cmp(&b.analysis_id));
    aggregation
}
