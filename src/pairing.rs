//! Tumour/normal pairing over canonical samples.
//!
//! Every (sample, strategy) combination is classified on its own: a WGS tumour
//! only pairs with a WGS normal, and a sample paired under one strategy may stay
//! unpaired under another.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::resolve::{CanonicalSample, SequencingExperiment};
use crate::submitter_index::SubmitterIndex;

/// Sample id to strategy to entry.
pub type ByStrategy<T> = BTreeMap<String, BTreeMap<String, T>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TumourNormalPair {
    pub sequencing_experiment_analysis_id: Vec<String>,
    pub matched_normal_sequencing_experiment_analysis_id: Vec<String>,
    #[serde(rename = "matchedNormalSubmitterSampleId")]
    pub matched_normal_submitter_sample_id: String,
    #[serde(rename = "matchedNormalSampleId")]
    pub matched_normal_sample_id: String,
}

/// A tumour whose matched normal exists but has no sequencing data under the
/// same strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TumourNotPaired {
    pub sequencing_experiment_analysis_id: Vec<String>,
    pub matched_normal_sequencing_experiment_analysis_id: Option<Vec<String>>,
    #[serde(rename = "matchedNormalSubmitterSampleId")]
    pub matched_normal_submitter_sample_id: String,
    #[serde(rename = "matchedNormalSampleId")]
    pub matched_normal_sample_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalPaired {
    pub sequencing_experiment_analysis_id: Vec<String>,
    pub matched_tumour_sequencing_experiment_analysis_ids: Vec<String>,
    pub matched_tumour_sample_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalNotPaired {
    pub sequencing_experiment_analysis_id: Vec<String>,
}

/// A tumour strategy whose matched normal could not be resolved at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairingIssue {
    pub strategy: String,
    pub sequencing_experiment_analysis_id: Vec<String>,
    #[serde(rename = "matchedNormalSubmitterSampleId")]
    pub matched_normal_submitter_sample_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pairing {
    pub tumour_normal_pairs: ByStrategy<TumourNormalPair>,
    pub tumour_not_paired: ByStrategy<TumourNotPaired>,
    pub normal_not_paired: ByStrategy<NormalNotPaired>,
    pub normal_paired: ByStrategy<NormalPaired>,
    pub issues: BTreeMap<String, Vec<PairingIssue>>,
}

impl Pairing {
    pub fn is_paired(&self, sample_id: &str, strategy: &str) -> bool {
        self.tumour_normal_pairs
            .get(sample_id)
            .is_some_and(|strategies| strategies.contains_key(strategy))
            || self
                .normal_paired
                .get(sample_id)
                .is_some_and(|strategies| strategies.contains_key(strategy))
    }
}

pub fn resolve_tumour_normal_pairs(
    samples: &BTreeMap<String, CanonicalSample>,
    index: &SubmitterIndex,
) -> Pairing {
    let mut pairing = Pairing::default();

    for tumour in samples.values().filter(|sample| sample.is_tumour()) {
        for (strategy, experiment) in &tumour.sequencing_experiment {
            pair_tumour_strategy(&mut pairing, samples, index, tumour, strategy, experiment);
        }
    }

    for normal in samples.values().filter(|sample| sample.is_normal()) {
        for (strategy, experiment) in &normal.sequencing_experiment {
            if pairing.is_paired(&normal.sample_id, strategy) {
                continue;
            }
            pairing
                .normal_not_paired
                .entry(normal.sample_id.clone())
                .or_default()
                .insert(
                    strategy.clone(),
                    NormalNotPaired {
                        sequencing_experiment_analysis_id: vec![
                            experiment.sequencing_experiment_analysis_id.clone(),
                        ],
                    },
                );
        }
    }

    pairing
}

fn pair_tumour_strategy(
    pairing: &mut Pairing,
    samples: &BTreeMap<String, CanonicalSample>,
    index: &SubmitterIndex,
    tumour: &CanonicalSample,
    strategy: &str,
    experiment: &SequencingExperiment,
) {
    let tumour_analysis_ids = vec![experiment.sequencing_experiment_analysis_id.clone()];
    let submitter_id = experiment.matched_normal_submitter_sample_id.as_deref();

    let Some((submitter_id, normal_sample_id)) =
        submitter_id.and_then(|id| index.lookup(id).map(|sample_id| (id, sample_id)))
    else {
        debug!(sample_id = %tumour.sample_id, %strategy, "no matched normal found");
        pairing
            .issues
            .entry(tumour.sample_id.clone())
            .or_default()
            .push(PairingIssue {
                strategy: strategy.to_string(),
                sequencing_experiment_analysis_id: tumour_analysis_ids.clone(),
                matched_normal_submitter_sample_id: submitter_id.map(str::to_string),
                message: format!(
                    "Failed to get matched normal sample, perhaps no sequencing data has been \
                     submitted for the normal sample. Strategy: {strategy}, \
                     sequencing_experiment: {tumour_analysis_ids:?}, \
                     matchedNormalSubmitterSampleId: {}",
                    submitter_id.unwrap_or("None")
                ),
            });
        return;
    };

    let normal_experiment = samples
        .get(normal_sample_id)
        .and_then(|normal| normal.sequencing_experiment.get(strategy));

    let Some(normal_experiment) = normal_experiment else {
        pairing
            .tumour_not_paired
            .entry(tumour.sample_id.clone())
            .or_default()
            .insert(
                strategy.to_string(),
                TumourNotPaired {
                    sequencing_experiment_analysis_id: tumour_analysis_ids,
                    matched_normal_sequencing_experiment_analysis_id: None,
                    matched_normal_submitter_sample_id: submitter_id.to_string(),
                    matched_normal_sample_id: normal_sample_id.to_string(),
                },
            );
        return;
    };

    let normal_analysis_ids = vec![normal_experiment.sequencing_experiment_analysis_id.clone()];
    pairing
        .tumour_normal_pairs
        .entry(tumour.sample_id.clone())
        .or_default()
        .insert(
            strategy.to_string(),
            TumourNormalPair {
                sequencing_experiment_analysis_id: tumour_analysis_ids.clone(),
                matched_normal_sequencing_experiment_analysis_id: normal_analysis_ids.clone(),
                matched_normal_submitter_sample_id: submitter_id.to_string(),
                matched_normal_sample_id: normal_sample_id.to_string(),
            },
        );

    let normal = pairing
        .normal_paired
        .entry(normal_sample_id.to_string())
        .or_default()
        .entry(strategy.to_string())
        .or_insert_with(|| NormalPaired {
            sequencing_experiment_analysis_id: normal_analysis_ids,
            matched_tumour_sequencing_experiment_analysis_ids: Vec::new(),
            matched_tumour_sample_ids: Vec::new(),
        });
    normal
        .matched_tumour_sequencing_experiment_analysis_ids
        .extend(tumour_analysis_ids);
    normal.matched_tumour_sample_ids.push(tumour.sample_id.clone());
}
