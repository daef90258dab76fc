//! Persistence contracts for documents, chunks and raw files.
//!
//! The core depends on these narrow interfaces; nearest-neighbor search
//! in particular is provided by the backing datastore, never
//! reimplemented here.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::types::{Category, Chunk, ChunkMatch, Document, DocumentStatus};

pub use http::{HttpDataStore, HttpObjectStore};
pub use memory::{cosine_similarity, MemoryStore};

/// Document rows and their lifecycle columns.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id.
    async fn get_document(&self, id: Uuid) -> Result<Document, PipelineError>;

    /// Fetch a category by id.
    async fn get_category(&self, id: Uuid) -> Result<Category, PipelineError>;

    /// Persist a status transition, refreshing `updated_at`.
    async fn set_status(&self, id: Uuid, status: DocumentStatus) -> Result<(), PipelineError>;

    /// Record a terminal transition: status, chunk count, and fresh
    /// `processed_at`/`updated_at` timestamps (also on failure paths).
    async fn finish(
        &self,
        id: Uuid,
        status: DocumentStatus,
        chunk_count: usize,
    ) -> Result<(), PipelineError>;
}

/// Chunk rows plus the vector similarity search.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Remove every chunk belonging to a document. Idempotent.
    async fn delete_chunks(&self, document_id: Uuid) -> Result<(), PipelineError>;

    /// Insert a batch of chunks.
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<(), PipelineError>;

    /// Insert a single chunk (fallback path when a batch insert fails).
    async fn insert_chunk(&self, chunk: &Chunk) -> Result<(), PipelineError>;

    /// Rank chunks of the given category against a query vector,
    /// descending by similarity, cut at `threshold`, truncated to `limit`.
    async fn search(
        &self,
        query: &[f32],
        category_id: Uuid,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ChunkMatch>, PipelineError>;
}

/// Raw file storage, keyed by a path namespaced per category/document.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn download(&self, path: &str) -> Result<Vec<u8>, PipelineError>;
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<(), PipelineError>;
    async fn delete(&self, path: &str) -> Result<(), PipelineError>;
}
