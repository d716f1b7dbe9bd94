use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ValidatorError {
    #[error("unknown tracked field path: {0}")]
    UnknownFieldPath(String),

    #[error("tracked fields must include {0}, tumour/normal pairing reads it")]
    MissingPairingField(&'static str),

    #[error("invalid donor id: {0:?}")]
    InvalidDonorId(String),

    #[error("invalid program id: {0:?}")]
    InvalidProgramId(String),

    #[error("can not specify both donor ids and a donor file")]
    ConflictingDonorSources,

    #[error("failed to read donor file at {0}")]
    DonorFileRead(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read analysis dump at {path}: {message}")]
    DumpRead { path: PathBuf, message: String },

    #[error("failed to parse analysis dump at {path}: {message}")]
    DumpParse { path: PathBuf, message: String },

    #[error("analysis document without analysisId in {0}")]
    MissingAnalysisId(PathBuf),

    #[error("malformed analysis document {analysis_id}: {message}")]
    MalformedAnalysis { analysis_id: String, message: String },

    #[error("search request failed: {0}")]
    SearchHttp(String),

    #[error("search backend returned status {status}: {message}")]
    SearchStatus { status: u16, message: String },

    #[error("unexpected search response: {0}")]
    SearchResponse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
