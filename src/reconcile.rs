//! Per-donor reconciliation: aggregation, resolution and pairing in one call.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::aggregate::{RejectedAnalysis, aggregate};
use crate::domain::{AnalysisRecord, DonorId};
use crate::fields::TrackedField;
use crate::pairing::{
    ByStrategy, NormalNotPaired, NormalPaired, PairingIssue, TumourNormalPair, TumourNotPaired,
    resolve_tumour_normal_pairs,
};
use crate::resolve::{CanonicalSample, SampleIssues, resolve_samples};
use crate::submitter_index::SubmitterIndex;

/// Everything learned about one donor. Holds no timestamps, so reconciling the
/// same records twice serializes to the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonorReport {
    pub donor_id: DonorId,
    pub samples: BTreeMap<String, CanonicalSample>,
    pub issues: BTreeMap<String, SampleIssues>,
    pub tumour_normal_pairs: ByStrategy<TumourNormalPair>,
    pub tumour_not_paired: ByStrategy<TumourNotPaired>,
    pub normal_not_paired: ByStrategy<NormalNotPaired>,
    pub normal_paired: ByStrategy<NormalPaired>,
    pub pairing_issues: BTreeMap<String, Vec<PairingIssue>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub submitter_id_collisions: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected_analyses: Vec<RejectedAnalysis>,
}

impl DonorReport {
    pub fn has_problems(&self) -> bool {
        !self.issues.is_empty()
            || !self.pairing_issues.is_empty()
            || !self.tumour_not_paired.is_empty()
            || !self.submitter_id_collisions.is_empty()
            || !self.rejected_analyses.is_empty()
    }
}

pub fn reconcile_donor(
    donor_id: &DonorId,
    records: &[AnalysisRecord],
    fields: &[TrackedField],
) -> DonorReport {
    let aggregation = aggregate(records, fields);
    let resolution = resolve_samples(&aggregation.samples);
    let index = SubmitterIndex::build(&resolution.samples);
    let pairing = resolve_tumour_normal_pairs(&resolution.samples, &index);

    info!(
        donor_id = %donor_id,
        analyses = records.len(),
        samples = resolution.samples.len(),
        samples_with_issues = resolution.issues.len(),
        pairs = pairing.tumour_normal_pairs.values().map(BTreeMap::len).sum::<usize>(),
        "donor reconciled"
    );

    DonorReport {
        donor_id: donor_id.clone(),
        samples: resolution.samples,
        issues: resolution.issues,
        tumour_normal_pairs: pairing.tumour_normal_pairs,
        tumour_not_paired: pairing.tumour_not_paired,
        normal_not_paired: pairing.normal_not_paired,
        normal_paired: pairing.normal_paired,
        pairing_issues: pairing.issues,
        submitter_id_collisions: index.collisions().clone(),
        rejected_analyses: aggregation.rejected,
    }
}
