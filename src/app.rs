use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::{DonorSelection, ResolvedConfig};
use crate::domain::{AnalysisRecord, DonorId, ProgramId};
use crate::error::ValidatorError;
use crate::ingest::{document_id, normalize_strategy, read_dump};
use crate::output::ReportWriter;
use crate::reconcile::{DonorReport, reconcile_donor};
use crate::search::{DONOR_ID_FIELD, STUDY_ID_FIELD, SearchClient, donor_search_body, terms_query};
use crate::workflow::{Workflow, WorkflowCandidate, workflow_candidates};

#[derive(Debug, Clone)]
pub struct ValidateOptions {
    pub index: String,
    pub program_id: ProgramId,
    pub donors: DonorSelection,
    pub workflow: Option<Workflow>,
    pub output: Option<ReportWriter>,
    pub debug_dump: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateResult {
    pub tool: String,
    pub generated_at: String,
    pub index: String,
    pub program_id: ProgramId,
    pub donors: Vec<DonorSummary>,
    pub failures: Vec<DonorFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Workflow>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub workflow_candidates: BTreeMap<DonorId, Vec<WorkflowCandidate>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DonorSummary {
    pub donor_id: DonorId,
    pub analyses: usize,
    pub samples: usize,
    pub samples_with_issues: usize,
    pub tumour_normal_pairs: usize,
    pub tumour_not_paired: usize,
    pub normal_not_paired: usize,
    pub pairing_issues: usize,
    pub rejected_analyses: usize,
    pub has_problems: bool,
    pub report_path: Option<String>,
}

impl DonorSummary {
    fn new(report: &DonorReport, analyses: usize, report_path: Option<String>) -> Self {
        Self {
            donor_id: report.donor_id.clone(),
            analyses,
            samples: report.samples.len(),
            samples_with_issues: report.issues.len(),
            tumour_normal_pairs: count_entries(&report.tumour_normal_pairs),
            tumour_not_paired: count_entries(&report.tumour_not_paired),
            normal_not_paired: count_entries(&report.normal_not_paired),
            pairing_issues: report.pairing_issues.values().map(Vec::len).sum(),
            rejected_analyses: report.rejected_analyses.len(),
            has_problems: report.has_problems(),
            report_path,
        }
    }
}

fn count_entries<T>(map: &BTreeMap<String, BTreeMap<String, T>>) -> usize {
    map.values().map(BTreeMap::len).sum()
}

#[derive(Debug, Clone, Serialize)]
pub struct DonorFailure {
    pub donor_id: DonorId,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub index: String,
    pub created_index: bool,
    pub files: Vec<IngestFileResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestFileResult {
    pub path: String,
    pub indexed: usize,
    pub normalized: usize,
}

/// A donor's analyses as fetched from the index.
#[derive(Debug, Clone)]
pub struct DonorAnalyses {
    pub documents: Vec<Value>,
    pub records: Vec<AnalysisRecord>,
    pub aggregations: Value,
}

pub struct App<C: SearchClient> {
    client: C,
    config: ResolvedConfig,
}

impl<C: SearchClient> App<C> {
    pub fn new(client: C, config: ResolvedConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn ingest(&self, index: &str, dumps: &[PathBuf]) -> Result<IngestResult, ValidatorError> {
        let created_index = if self.client.index_exists(index)? {
            false
        } else {
            info!(%index, "creating index");
            self.client.create_index(index, &self.config.mapping)?;
            true
        };

        let mut files = Vec::with_capacity(dumps.len());
        for path in dumps {
            let documents = read_dump(path)?;
            info!(path = %path.display(), documents = documents.len(), "start indexing analyses");
            let mut normalized = 0;
            for mut document in documents.iter().cloned() {
                if normalize_strategy(&mut document) {
                    normalized += 1;
                }
                let id = document_id(&document)
                    .ok_or_else(|| ValidatorError::MissingAnalysisId(path.clone()))?
                    .to_string();
                self.client.index_document(index, &id, &document)?;
            }
            info!(path = %path.display(), documents = documents.len(), "indexed analyses");
            files.push(IngestFileResult {
                path: path.display().to_string(),
                indexed: documents.len(),
                normalized,
            });
        }

        Ok(IngestResult {
            index: index.to_string(),
            created_index,
            files,
        })
    }

    pub fn list_donors(
        &self,
        index: &str,
        program_id: &ProgramId,
    ) -> Result<Vec<DonorId>, ValidatorError> {
        let query = terms_query(STUDY_ID_FIELD, &[program_id.as_str()]);
        let keys = self.client.aggregate_distinct(index, DONOR_ID_FIELD, &query)?;
        let mut donors = Vec::with_capacity(keys.len());
        for key in keys {
            match key.parse::<DonorId>() {
                Ok(donor) => donors.push(donor),
                Err(err) => warn!(%key, %err, "skipping donor bucket"),
            }
        }
        Ok(donors)
    }

    pub fn fetch_donor(
        &self,
        index: &str,
        donor_id: &DonorId,
    ) -> Result<DonorAnalyses, ValidatorError> {
        let body = donor_search_body(donor_id.as_str(), self.config.aggregations.as_ref());
        let response = self.client.search(index, &body, self.config.page_size)?;
        if let Some(total) = response.total {
            if total > response.hits.len() as u64 {
                warn!(
                    donor_id = %donor_id,
                    total,
                    fetched = response.hits.len(),
                    "donor has more analyses than one page; results are partial"
                );
            }
        }

        let records = response
            .hits
            .iter()
            .map(|document| {
                serde_json::from_value::<AnalysisRecord>(document.clone()).map_err(|err| {
                    ValidatorError::MalformedAnalysis {
                        analysis_id: document_id(document).unwrap_or("<unknown>").to_string(),
                        message: err.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DonorAnalyses {
            documents: response.hits,
            records,
            aggregations: response.aggregations,
        })
    }

    pub fn validate_donor(
        &self,
        index: &str,
        donor_id: &DonorId,
    ) -> Result<(DonorReport, DonorAnalyses), ValidatorError> {
        let analyses = self.fetch_donor(index, donor_id)?;
        let report = reconcile_donor(donor_id, &analyses.records, &self.config.tracked_fields);
        Ok((report, analyses))
    }

    /// Reconciles every selected donor. A donor that fails is recorded and the
    /// run moves on to the next one.
    pub fn validate(&self, options: &ValidateOptions) -> Result<ValidateResult, ValidatorError> {
        let donor_ids = match &options.donors {
            DonorSelection::Explicit(ids) => ids.clone(),
            DonorSelection::Program => self.list_donors(&options.index, &options.program_id)?,
        };
        info!(program_id = %options.program_id, donors = donor_ids.len(), "validating donors");

        let mut result = ValidateResult {
            tool: format!("song-validator/{}", env!("CARGO_PKG_VERSION")),
            generated_at: chrono::Utc::now().to_rfc3339(),
            index: options.index.clone(),
            program_id: options.program_id.clone(),
            donors: Vec::new(),
            failures: Vec::new(),
            workflow: options.workflow,
            workflow_candidates: BTreeMap::new(),
        };

        for donor_id in &donor_ids {
            match self.validate_one(options, donor_id) {
                Ok((report, summary)) => {
                    if let Some(workflow) = options.workflow {
                        result
                            .workflow_candidates
                            .insert(donor_id.clone(), workflow_candidates(workflow, &report));
                    }
                    result.donors.push(summary);
                }
                Err(err) => {
                    warn!(donor_id = %donor_id, %err, "donor validation failed");
                    result.failures.push(DonorFailure {
                        donor_id: donor_id.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        Ok(result)
    }

    fn validate_one(
        &self,
        options: &ValidateOptions,
        donor_id: &DonorId,
    ) -> Result<(DonorReport, DonorSummary), ValidatorError> {
        let (report, analyses) = self.validate_donor(&options.index, donor_id)?;
        let report_path = match &options.output {
            Some(writer) => {
                if options.debug_dump {
                    writer.write_debug_dump(
                        donor_id.as_str(),
                        &analyses.documents,
                        &analyses.aggregations,
                    )?;
                }
                Some(writer.write_report(&report)?.to_string())
            }
            None => None,
        };
        let summary = DonorSummary::new(&report, analyses.records.len(), report_path);
        Ok((report, summary))
    }
}
