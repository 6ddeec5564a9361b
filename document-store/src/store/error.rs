use service_core::error::AppError;
use std::fmt;
use thiserror::Error;

/// Which half of a two-phase delete failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePhase {
    /// Blob removal failed; nothing was changed.
    Blob,
    /// Blob is gone but the metadata row is still there.
    Metadata,
}

impl fmt::Display for DeletePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletePhase::Blob => write!(f, "file"),
            DeletePhase::Metadata => write!(f, "metadata"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid input: {0}")]
    Validation(#[source] AppError),

    #[error("Failed to load documents: {0}")]
    Fetch(#[source] AppError),

    #[error("Failed to upload file: {0}")]
    Upload(#[source] AppError),

    /// The blob at `orphan_path` was stored but has no metadata row.
    #[error("Failed to save document metadata: {source}")]
    Insert { orphan_path: String, source: AppError },

    #[error("Failed to download file: {0}")]
    Download(#[source] AppError),

    #[error("Failed to delete document {phase}: {source}")]
    Delete { phase: DeletePhase, source: AppError },
}

impl From<validator::ValidationErrors> for DocumentError {
    fn from(err: validator::ValidationErrors) -> Self {
        DocumentError::Validation(AppError::from(err))
    }
}
