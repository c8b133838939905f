//! Error taxonomy for loading, evaluating and rendering crowd records.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("required input file not found: {}", path.display())]
    MissingInputFile { path: PathBuf },

    /// Row-level defect. The record loader logs and skips these; they never abort a run.
    #[error("malformed record row at line {line}: {reason}")]
    MalformedRecordRow { line: usize, reason: String },

    #[error("malformed metadata document {}: {reason}", path.display())]
    MalformedMetadataDocument { path: PathBuf, reason: String },

    #[error("metadata field `{0}` is missing")]
    MissingMetadataField(&'static str),

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("label sequences differ in length: truth has {truth}, prediction has {pred}")]
    LabelLengthMismatch { truth: usize, pred: usize },

    #[error("time axis has {axis} entries but there are {records} records")]
    AxisLengthMismatch { axis: usize, records: usize },

    #[error("failed to write artifact {}: {reason}", path.display())]
    ArtifactWriteFailure { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub(crate) fn write_failure(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        AnalysisError::ArtifactWriteFailure { path: path.into(), reason: reason.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
