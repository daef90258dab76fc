//! In-memory store used by tests and local runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{ChunkStore, DocumentStore, ObjectStore};
use crate::error::PipelineError;
use crate::types::{Category, Chunk, ChunkMatch, Document, DocumentStatus};

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for empty or mismatched-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

#[derive(Default)]
struct Inner {
    documents: HashMap<Uuid, Document>,
    categories: HashMap<Uuid, Category>,
    chunks: HashMap<Uuid, Vec<Chunk>>,
    objects: HashMap<String, Vec<u8>>,
}

/// In-memory implementation of every store contract.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document row.
    pub fn insert_document(&self, document: Document) {
        self.inner
            .lock()
            .unwrap()
            .documents
            .insert(document.id, document);
    }

    /// Seed a category row.
    pub fn insert_category(&self, category: Category) {
        self.inner
            .lock()
            .unwrap()
            .categories
            .insert(category.id, category);
    }

    /// Seed a raw file.
    pub fn put_object(&self, path: &str, bytes: Vec<u8>) {
        self.inner.lock().unwrap().objects.insert(path.to_string(), bytes);
    }

    /// Current document row, if any.
    pub fn document(&self, id: Uuid) -> Option<Document> {
        self.inner.lock().unwrap().documents.get(&id).cloned()
    }

    /// Chunks currently stored for a document.
    pub fn chunks_for(&self, document_id: Uuid) -> Vec<Chunk> {
        self.inner
            .lock()
            .unwrap()
            .chunks
            .get(&document_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, id: Uuid) -> Result<Document, PipelineError> {
        self.inner
            .lock()
            .unwrap()
            .documents
            .get(&id)
            .cloned()
            .ok_or(PipelineError::NotFound(id))
    }

    async fn get_category(&self, id: Uuid) -> Result<Category, PipelineError> {
        self.inner
            .lock()
            .unwrap()
            .categories
            .get(&id)
            .cloned()
            .ok_or(PipelineError::NotFound(id))
    }

    async fn set_status(&self, id: Uuid, status: DocumentStatus) -> Result<(), PipelineError> {
        let mut inner = self.inner.lock().unwrap();
        let document = inner
            .documents
            .get_mut(&id)
            .ok_or(PipelineError::NotFound(id))?;
        document.status = status;
        document.updated_at = Utc::now();
        Ok(())
    }

    async fn finish(
        &self,
        id: Uuid,
        status: DocumentStatus,
        chunk_count: usize,
    ) -> Result<(), PipelineError> {
        let mut inner = self.inner.lock().unwrap();
        let document = inner
            .documents
            .get_mut(&id)
            .ok_or(PipelineError::NotFound(id))?;
        let now = Utc::now();
        document.status = status;
        document.chunk_count = chunk_count;
        document.processed_at = Some(now);
        document.updated_at = now;
        Ok(())
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
    async fn delete_chunks(&self, document_id: Uuid) -> Result<(), PipelineError> {
        self.inner.lock().unwrap().chunks.remove(&document_id);
        Ok(())
    }

    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<(), PipelineError> {
        let mut inner = self.inner.lock().unwrap();
        for chunk in chunks {
            inner
                .chunks
                .entry(chunk.document_id)
                .or_default()
                .push(chunk.clone());
        }
        Ok(())
    }

    async fn insert_chunk(&self, chunk: &Chunk) -> Result<(), PipelineError> {
        self.insert_chunks(std::slice::from_ref(chunk)).await
    }

    async fn search(
        &self,
        query: &[f32],
        category_id: Uuid,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ChunkMatch>, PipelineError> {
        let inner = self.inner.lock().unwrap();

        let mut matches: Vec<ChunkMatch> = inner
            .chunks
            .iter()
            .filter_map(|(document_id, chunks)| {
                let document = inner.documents.get(document_id)?;
                if document.category_id != category_id {
                    return None;
                }
                Some(chunks.iter().map(|chunk| ChunkMatch {
                    content: chunk.content.clone(),
                    document_name: document.name.clone(),
                    similarity: cosine_similarity(query, &chunk.embedding),
                }))
            })
            .flatten()
            .filter(|m| m.similarity >= threshold)
            .collect();

        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(limit);
        Ok(matches)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn download(&self, path: &str) -> Result<Vec<u8>, PipelineError> {
        self.inner
            .lock()
            .unwrap()
            .objects
            .get(path)
            .cloned()
            .ok_or_else(|| PipelineError::Download {
                path: path.to_string(),
                reason: "object not found".to_string(),
            })
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<(), PipelineError> {
        self.inner.lock().unwrap().objects.insert(path.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), PipelineError> {
        self.inner.lock().unwrap().objects.remove(path);
        Ok(())
    }
}
