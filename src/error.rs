//! Error taxonomy for the ingestion pipeline and query path.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the ingestion pipeline and the answer composer.
///
/// `NotFound`, `Download`, `Extraction` and `EmptyChunkSet` abort a
/// document's run and force it into the `error` state. `Embedding` and
/// `Persistence` are handled per chunk (the chunk is skipped, the run
/// continues). `Completion` is fatal to a single chat request only.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("document not found: {0}")]
    NotFound(Uuid),

    #[error("download failed for {path}: {reason}")]
    Download { path: String, reason: String },

    #[error("extraction failed for {format}: {reason}")]
    Extraction { format: String, reason: String },

    #[error("no chunks produced from extracted text")]
    EmptyChunkSet,

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("chunk persistence failed: {0}")]
    Persistence(String),

    #[error("completion request failed: {0}")]
    Completion(String),
}

impl PipelineError {
    /// Extraction error constructor that stringifies the format tag.
    pub fn extraction(format: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::Extraction {
            format: format.to_string(),
            reason: reason.into(),
        }
    }
}
