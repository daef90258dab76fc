//! Document, category and chunk definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an uploaded document.
///
/// Moves `pending → processing → {processed, error}`; both terminal
/// states are re-enterable through a reprocess request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Uploaded, waiting for a processing run
    Pending,
    /// A run owns this document right now
    Processing,
    /// At least one chunk was embedded and persisted
    Processed,
    /// The last run failed before persisting any chunk
    Error,
}

impl DocumentStatus {
    /// Whether a run for this document has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Processed | DocumentStatus::Error)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Pending => write!(f, "pending"),
            DocumentStatus::Processing => write!(f, "processing"),
            DocumentStatus::Processed => write!(f, "processed"),
            DocumentStatus::Error => write!(f, "error"),
        }
    }
}

/// An uploaded document tracked by the lifecycle manager.
///
/// Source bytes are immutable once uploaded; reprocessing re-derives
/// chunks but never the stored file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier
    pub id: Uuid,

    /// Category this document belongs to (retrieval scope)
    pub category_id: Uuid,

    /// Display name shown in citations
    pub name: String,

    /// Object-storage key for the raw bytes
    pub file_path: String,

    /// Declared MIME type, drives extractor and chunker selection
    pub file_type: String,

    /// Size of the stored file in bytes
    pub file_size: u64,

    /// Current lifecycle status
    pub status: DocumentStatus,

    /// Chunks persisted by the latest successful run
    pub chunk_count: usize,

    /// When the document row was created
    pub created_at: DateTime<Utc>,

    /// When the latest run reached a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,

    /// Refreshed on every status transition
    pub updated_at: DateTime<Utc>,
}

/// A logical partition of documents; queries are always scoped to one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

/// A persisted fragment of a document's extracted text plus its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Document this chunk was derived from
    pub document_id: Uuid,

    /// Order within the document (0-based, contiguous per run)
    pub chunk_index: usize,

    /// The text content
    pub content: String,

    /// Embedding vector for similarity search
    pub embedding: Vec<f32>,

    /// Structural metadata
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Build a chunk for `content` at position `index`, embedding attached.
    pub fn new(document_id: Uuid, index: usize, content: String, embedding: Vec<f32>, batch: usize) -> Self {
        let metadata = ChunkMetadata {
            length: content.chars().count(),
            position: index,
            batch,
        };
        Self {
            document_id,
            chunk_index: index,
            content,
            embedding,
            metadata,
        }
    }
}

/// Metadata stored alongside each chunk row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Character length of the content
    pub length: usize,

    /// Ordinal position within the document
    pub position: usize,

    /// Embedding batch this chunk was processed in
    pub batch: usize,
}

/// A similarity-search hit returned by the chunk store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMatch {
    /// Matched chunk text
    pub content: String,

    /// Display name of the owning document
    pub document_name: String,

    /// Cosine similarity against the query vector
    pub similarity: f32,
}
