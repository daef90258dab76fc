//! REST-backed store implementations for the production datastore and
//! object storage services.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ChunkStore, DocumentStore, ObjectStore};
use crate::error::PipelineError;
use crate::types::{Category, Chunk, ChunkMatch, Document, DocumentStatus};

/// Client for the relational + vector datastore service.
pub struct HttpDataStore {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct StatusUpdate {
    status: DocumentStatus,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct TerminalUpdate {
    status: DocumentStatus,
    chunk_count: usize,
    processed_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct InsertChunksRequest<'a> {
    chunks: &'a [Chunk],
}

/// Payload for the datastore's similarity-search procedure.
#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query_embedding: &'a [f32],
    match_threshold: f32,
    match_count: usize,
    category_filter: Uuid,
}

#[derive(Debug, Deserialize)]
struct SearchRow {
    chunk_content: String,
    document_name: String,
    similarity: f32,
}

impl HttpDataStore {
    /// Create a new datastore client.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Map a non-success datastore response to a persistence error.
async fn persistence_error(
    operation: &str,
    response: reqwest::Response,
) -> PipelineError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    PipelineError::Persistence(format!("{} returned {}: {}", operation, status, body))
}

#[async_trait]
impl DocumentStore for HttpDataStore {
    async fn get_document(&self, id: Uuid) -> Result<Document, PipelineError> {
        let response = self
            .client
            .get(self.url(&format!("documents/{}", id)))
            .send()
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PipelineError::NotFound(id));
        }
        if !response.status().is_success() {
            return Err(persistence_error("get document", response).await);
        }
        response
            .json()
            .await
            .map_err(|e| PipelineError::Persistence(format!("malformed document row: {}", e)))
    }

    async fn get_category(&self, id: Uuid) -> Result<Category, PipelineError> {
        let response = self
            .client
            .get(self.url(&format!("categories/{}", id)))
            .send()
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PipelineError::NotFound(id));
        }
        if !response.status().is_success() {
            return Err(persistence_error("get category", response).await);
        }
        response
            .json()
            .await
            .map_err(|e| PipelineError::Persistence(format!("malformed category row: {}", e)))
    }

    async fn set_status(&self, id: Uuid, status: DocumentStatus) -> Result<(), PipelineError> {
        let update = StatusUpdate {
            status,
            updated_at: Utc::now(),
        };
        let response = self
            .client
            .patch(self.url(&format!("documents/{}", id)))
            .json(&update)
            .send()
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        if !response.status().is_success() {
            return Err(persistence_error("status update", response).await);
        }
        Ok(())
    }

    async fn finish(
        &self,
        id: Uuid,
        status: DocumentStatus,
        chunk_count: usize,
    ) -> Result<(), PipelineError> {
        let now = Utc::now();
        let update = TerminalUpdate {
            status,
            chunk_count,
            processed_at: now,
            updated_at: now,
        };
        let response = self
            .client
            .patch(self.url(&format!("documents/{}", id)))
            .json(&update)
            .send()
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        if !response.status().is_success() {
            return Err(persistence_error("terminal update", response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl ChunkStore for HttpDataStore {
    async fn delete_chunks(&self, document_id: Uuid) -> Result<(), PipelineError> {
        let response = self
            .client
            .delete(self.url(&format!("documents/{}/chunks", document_id)))
            .send()
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        // 404 means there was nothing to delete; the operation is idempotent.
        if !response.status().is_success()
            && response.status() != reqwest::StatusCode::NOT_FOUND
        {
            return Err(persistence_error("chunk deletion", response).await);
        }
        Ok(())
    }

    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<(), PipelineError> {
        let response = self
            .client
            .post(self.url("chunks"))
            .json(&InsertChunksRequest { chunks })
            .send()
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        if !response.status().is_success() {
            return Err(persistence_error("chunk insert", response).await);
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
        let request = SearchRequest {
            query_embedding: query,
            match_threshold: threshold,
            match_count: limit,
            category_filter: category_id,
        };
        let response = self
            .client
            .post(self.url("rpc/search_similar_chunks"))
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        if !response.status().is_success() {
            return Err(persistence_error("similarity search", response).await);
        }

        let rows: Vec<SearchRow> = response
            .json()
            .await
            .map_err(|e| PipelineError::Persistence(format!("malformed search rows: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|row| ChunkMatch {
                content: row.chunk_content,
                document_name: row.document_name,
                similarity: row.similarity,
            })
            .collect())
    }
}

/// Client for the raw-file object storage service.
pub struct HttpObjectStore {
    client: Client,
    base_url: String,
}

impl HttpObjectStore {
    /// Create a new object storage client.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn download(&self, path: &str) -> Result<Vec<u8>, PipelineError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| PipelineError::Download {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(PipelineError::Download {
                path: path.to_string(),
                reason: format!("storage returned {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| PipelineError::Download {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<(), PipelineError> {
        let response = self
            .client
            .put(self.url(path))
            .body(bytes)
            .send()
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        if !response.status().is_success() {
            return Err(persistence_error("object upload", response).await);
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), PipelineError> {
        let response = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        if !response.status().is_success()
            && response.status() != reqwest::StatusCode::NOT_FOUND
        {
            return Err(persistence_error("object delete", response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let store = HttpDataStore::new("http://datastore:8000/");
        assert_eq!(
            store.url("documents/abc"),
            "http://datastore:8000/documents/abc"
        );
    }

    #[test]
    fn object_paths_join_cleanly() {
        let store = HttpObjectStore::new("http://storage:8001");
        assert_eq!(
            store.url("/category/doc.pdf"),
            "http://storage:8001/category/doc.pdf"
        );
    }
}
