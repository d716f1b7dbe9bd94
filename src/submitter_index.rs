use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::resolve::CanonicalSample;

/// Submitter sample id to internal sample id, built from canonical samples only.
///
/// Samples whose submitter id is disputed never enter the index, so no tumour can
/// name them as a matched normal. A submitter id claimed by more than one sample
/// is ambiguous and kept out of lookups as well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmitterIndex {
    entries: BTreeMap<String, String>,
    collisions: BTreeMap<String, Vec<String>>,
}

impl SubmitterIndex {
    pub fn build(samples: &BTreeMap<String, CanonicalSample>) -> Self {
        let mut claims: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for sample in samples.values() {
            if let Some(submitter_id) = sample.submitter_sample_id() {
                claims
                    .entry(submitter_id.to_string())
                    .or_default()
                    .push(sample.sample_id.clone());
            }
        }

        let mut index = Self::default();
        for (submitter_id, mut sample_ids) in claims {
            if sample_ids.len() == 1 {
                index.entries.insert(submitter_id, sample_ids.remove(0));
            } else {
                warn!(%submitter_id, ?sample_ids, "submitter sample id claimed by several samples");
                index.collisions.insert(submitter_id, sample_ids);
            }
        }
        index
    }

    pub fn lookup(&self, submitter_sample_id: &str) -> Option<&str> {
        self.entries.get(submitter_sample_id).map(String::as_str)
    }

    pub fn collisions(&self) -> &BTreeMap<String, Vec<String>> {
        &self.collisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::TrackedField;

    fn sample(sample_id: &str, submitter: Option<Option<&str>>) -> CanonicalSample {
        let mut fields = BTreeMap::new();
        if let Some(value) = submitter {
            fields.insert(TrackedField::SubmitterSampleId, value.map(str::to_string));
        }
        CanonicalSample {
            sample_id: sample_id.to_string(),
            analysis_ids: vec![format!("{sample_id}-a")],
            fields,
            sequencing_experiment: BTreeMap::new(),
        }
    }

    fn samples(list: Vec<CanonicalSample>) -> BTreeMap<String, CanonicalSample> {
        list.into_iter()
            .map(|sample| (sample.sample_id.clone(), sample))
            .collect()
    }

    #[test]
    fn maps_canonical_submitter_ids() {
        let index = SubmitterIndex::build(&samples(vec![
            sample("SA1", Some(Some("T1"))),
            sample("SA2", Some(Some("N1"))),
        ]));
        assert_eq!(index.lookup("N1"), Some("SA2"));
        assert_eq!(index.lookup("T1"), Some("SA1"));
        assert_eq!(index.lookup("SA2"), None);
    }

    #[test]
    fn disputed_and_empty_ids_are_absent() {
        let index = SubmitterIndex::build(&samples(vec![
            sample("SA1", None),
            sample("SA2", Some(None)),
        ]));
        assert_eq!(index, SubmitterIndex::default());
        assert_eq!(index.lookup("None"), None);
    }

    #[test]
    fn shared_submitter_id_is_a_collision() {
        let index = SubmitterIndex::build(&samples(vec![
            sample("SA2", Some(Some("N1"))),
            sample("SA1", Some(Some("N1"))),
            sample("SA3", Some(Some("T1"))),
        ]));
        assert_eq!(index.lookup("N1"), None);
        assert_eq!(index.lookup("T1"), Some("SA3"));
        assert_eq!(index.collisions()["N1"], vec!["SA1", "SA2"]);
    }
}
