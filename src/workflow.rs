use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::reconcile::DonorReport;

pub const WGS: &str = "WGS";
pub const WXS: &str = "WXS";

/// Downstream analysis workflows a donor can be scheduled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Workflow {
    DnaAlignment,
    SangerWgs,
    SangerWxs,
    Mutect2,
}

impl Workflow {
    /// Strategy a tumour/normal pair must share, for the variant-calling workflows.
    pub fn paired_strategy(self) -> Option<&'static str> {
        match self {
            Workflow::DnaAlignment => None,
            Workflow::SangerWgs | Workflow::Mutect2 => Some(WGS),
            Workflow::SangerWxs => Some(WXS),
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Workflow::DnaAlignment => write!(f, "dna-alignment"),
            Workflow::SangerWgs => write!(f, "sanger-wgs"),
            Workflow::SangerWxs => write!(f, "sanger-wxs"),
            Workflow::Mutect2 => write!(f, "mutect2"),
        }
    }
}

/// One unit of work a workflow could run on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowCandidate {
    Alignment {
        sample_id: String,
        strategy: String,
        sequencing_experiment_analysis_id: String,
    },
    TumourNormal {
        tumour_sample_id: String,
        normal_sample_id: String,
        strategy: String,
        tumour_sequencing_experiment_analysis_id: Vec<String>,
        normal_sequencing_experiment_analysis_id: Vec<String>,
    },
}

pub fn workflow_candidates(workflow: Workflow, report: &DonorReport) -> Vec<WorkflowCandidate> {
    match workflow.paired_strategy() {
        None => report
            .samples
            .values()
            .flat_map(|sample| {
                sample
                    .sequencing_experiment
                    .iter()
                    .filter(|(strategy, _)| matches!(strategy.as_str(), WGS | WXS))
                    .map(move |(strategy, experiment)| WorkflowCandidate::Alignment {
                        sample_id: sample.sample_id.clone(),
                        strategy: strategy.clone(),
                        sequencing_experiment_analysis_id: experiment
                            .sequencing_experiment_analysis_id
                            .clone(),
                    })
            })
            .collect(),
        Some(required) => report
            .tumour_normal_pairs
            .iter()
            .filter_map(|(tumour_sample_id, strategies)| {
                strategies
                    .get(required)
                    .map(|pair| WorkflowCandidate::TumourNormal {
                        tumour_sample_id: tumour_sample_id.clone(),
                        normal_sample_id: pair.matched_normal_sample_id.clone(),
                        strategy: required.to_string(),
                        tumour_sequencing_experiment_analysis_id: pair
                            .sequencing_experiment_analysis_id
                            .clone(),
                        normal_sequencing_experiment_analysis_id: pair
                            .matched_normal_sequencing_experiment_analysis_id
                            .clone(),
                    })
            })
            .collect(),
    }
}
