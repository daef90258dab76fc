//! Processor that runs the ingestion pipeline for one document.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chunkers::ChunkingRouter;
use crate::clients::Embedder;
use crate::error::PipelineError;
use crate::extract;
use crate::store::{ChunkStore, DocumentStore, ObjectStore};
use crate::types::{AppConfig, Chunk, ChunkConfig, DocumentStatus};

/// Result of a completed processing run.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub document_id: Uuid,
    /// Chunks that were embedded and persisted
    pub chunks_processed: usize,
    /// Chunks the chunker produced
    pub total_chunks: usize,
    pub status: DocumentStatus,
}

impl ProcessOutcome {
    /// Whether the run reached the `processed` state.
    pub fn success(&self) -> bool {
        self.status == DocumentStatus::Processed
    }
}

/// Orchestrates extraction, chunking, embedding and persistence for one
/// document and tracks its lifecycle status.
///
/// Runs are per-document and independent; each run owns its document's
/// chunk set for the run's duration through the destructive-replace
/// step. There is no cancellation for an in-flight run.
pub struct DocumentProcessor {
    documents: Arc<dyn DocumentStore>,
    chunks: Arc<dyn ChunkStore>,
    objects: Arc<dyn ObjectStore>,
    embedder: Arc<dyn Embedder>,
    router: ChunkingRouter,
    chunking: ChunkConfig,
    embed_batch_size: usize,
    batch_pause: Duration,
}

impl DocumentProcessor {
    /// Create a new processor over the given collaborators.
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        chunks: Arc<dyn ChunkStore>,
        objects: Arc<dyn ObjectStore>,
        embedder: Arc<dyn Embedder>,
        config: &AppConfig,
    ) -> Self {
        Self {
            documents,
            chunks,
            objects,
            embedder,
            router: ChunkingRouter::new(),
            chunking: config.chunking.clone(),
            embed_batch_size: config.embed_batch_size.max(1),
            batch_pause: Duration::from_millis(config.batch_pause_ms),
        }
    }

    /// Run the full pipeline for a document, from any state.
    ///
    /// Serves both the initial upload trigger and reprocess requests;
    /// every run replaces the document's chunk set. Once the document
    /// identity has been resolved, any failure forces the `error` state
    /// before it is reported, so a document is never left stuck in
    /// `processing`.
    pub async fn process(&self, document_id: Uuid) -> Result<ProcessOutcome, PipelineError> {
        let result = self.run(document_id).await;

        if let Err(err) = &result {
            if !matches!(err, PipelineError::NotFound(_)) {
                warn!(document_id = %document_id, error = %err, "Document run failed");
                if let Err(finish_err) = self
                    .documents
                    .finish(document_id, DocumentStatus::Error, 0)
                    .await
                {
                    warn!(
                        document_id = %document_id,
                        error = %finish_err,
                        "Failed to record error state"
                    );
                }
            }
        }

        result
    }

    async fn run(&self, document_id: Uuid) -> Result<ProcessOutcome, PipelineError> {
        let document = self.documents.get_document(document_id).await?;
        info!(
            document_id = %document_id,
            name = %document.name,
            file_type = %document.file_type,
            "Starting document run"
        );

        // Persisted before any extraction work begins, so a mid-run
        // crash leaves the document visibly `processing`.
        self.documents
            .set_status(document_id, DocumentStatus::Processing)
            .await?;

        let bytes = self.objects.download(&document.file_path).await?;
        let extracted = extract::extract(&bytes, &document.file_type).await?;

        let chunker = self.router.for_format(extracted.format);
        let segments = chunker.chunk(&extracted.text, &self.chunking);
        if segments.is_empty() {
            return Err(PipelineError::EmptyChunkSet);
        }
        info!(
            document_id = %document_id,
            chunker = chunker.name(),
            segments = segments.len(),
            "Chunked extracted text"
        );

        // Chunk indices are deterministic per run, so a failed deletion
        // is logged but does not abort: stale rows get overwritten.
        if let Err(e) = self.chunks.delete_chunks(document_id).await {
            warn!(document_id = %document_id, error = %e, "Failed to delete existing chunks");
        }

        let total_chunks = segments.len();
        let chunks_processed = self.embed_and_persist(document_id, segments).await;

        let status = if chunks_processed > 0 {
            DocumentStatus::Processed
        } else {
            DocumentStatus::Error
        };
        self.documents
            .finish(document_id, status, chunks_processed)
            .await?;

        info!(
            document_id = %document_id,
            status = %status,
            chunks_processed,
            total_chunks,
            "Document run finished"
        );

        Ok(ProcessOutcome {
            document_id,
            chunks_processed,
            total_chunks,
            status,
        })
    }

    /// Embed and persist segments in bounded concurrent batches.
    ///
    /// A single segment's embedding or persistence failure is logged
    /// and the segment skipped; the run continues. A short pause after
    /// each batch paces requests to the embedding service.
    async fn embed_and_persist(&self, document_id: Uuid, segments: Vec<String>) -> usize {
        let mut persisted = 0usize;
        let mut next_index = 0usize;
        let total = segments.len();

        for (batch_number, batch) in segments.chunks(self.embed_batch_size).enumerate() {
            let embeddings =
                join_all(batch.iter().map(|segment| self.embedder.embed(segment))).await;

            let mut ready = Vec::with_capacity(batch.len());
            for (offset, (segment, embedding)) in batch.iter().zip(embeddings).enumerate() {
                match embedding {
                    Ok(vector) => {
                        ready.push(Chunk::new(
                            document_id,
                            next_index,
                            segment.clone(),
                            vector,
                            batch_number,
                        ));
                        next_index += 1;
                    }
                    Err(e) => {
                        warn!(
                            document_id = %document_id,
                            batch = batch_number,
                            segment = batch_number * self.embed_batch_size + offset,
                            error = %e,
                            "Skipping chunk after embedding failure"
                        );
                    }
                }
            }

            persisted += self.persist_batch(document_id, &ready).await;

            let processed_so_far = (batch_number + 1) * self.embed_batch_size;
            if processed_so_far < total {
                tokio::time::sleep(self.batch_pause).await;
            }
        }

        persisted
    }

    /// Insert a batch of chunks, falling back to individual inserts.
    async fn persist_batch(&self, document_id: Uuid, chunks: &[Chunk]) -> usize {
        if chunks.is_empty() {
            return 0;
        }

        match self.chunks.insert_chunks(chunks).await {
            Ok(()) => chunks.len(),
            Err(e) => {
                warn!(
                    document_id = %document_id,
                    error = %e,
                    "Batch insert failed, falling back to individual inserts"
                );
                let mut inserted = 0;
                for chunk in chunks {
                    match self.chunks.insert_chunk(chunk).await {
                        Ok(()) => inserted += 1,
                        Err(e) => warn!(
                            document_id = %document_id,
                            chunk_index = chunk.chunk_index,
                            error = %e,
                            "Skipping chunk after persistence failure"
                        ),
                    }
                }
                inserted
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{Category, Document};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embedder that fails on a chosen set of calls.
    struct StubEmbedder {
        calls: AtomicUsize,
        fail_calls: Vec<usize>,
        fail_all: bool,
    }

    impl StubEmbedder {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_calls: Vec::new(),
                fail_all: false,
            }
        }

        fn failing_on(calls: Vec<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_calls: calls,
                fail_all: false,
            }
        }

        fn always_failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_calls: Vec::new(),
                fail_all: true,
            }
        }
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_all || self.fail_calls.contains(&call) {
                return Err(PipelineError::Embedding("stubbed failure".to_string()));
            }
            Ok(vec![text.chars().count() as f32, 1.0, 0.5])
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        processor: DocumentProcessor,
        document_id: Uuid,
    }

    fn fixture_with(embedder: StubEmbedder, body: &[u8], file_type: &str) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let category = Category {
            id: Uuid::new_v4(),
            name: "Handbooks".to_string(),
        };
        let document_id = Uuid::new_v4();
        let file_path = format!("{}/{}", category.id, "handbook.txt");
        store.insert_category(category.clone());
        store.insert_document(Document {
            id: document_id,
            category_id: category.id,
            name: "handbook.txt".to_string(),
            file_path: file_path.clone(),
            file_type: file_type.to_string(),
            file_size: body.len() as u64,
            status: DocumentStatus::Pending,
            chunk_count: 0,
            created_at: Utc::now(),
            processed_at: None,
            updated_at: Utc::now(),
        });
        store.put_object(&file_path, body.to_vec());

        let config = AppConfig {
            batch_pause_ms: 0,
            ..Default::default()
        };
        let processor = DocumentProcessor::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(embedder),
            &config,
        );

        Fixture {
            store,
            processor,
            document_id,
        }
    }

    fn prose(chars: usize) -> Vec<u8> {
        let mut out = String::new();
        let mut i = 0;
        while out.len() < chars {
            out.push_str(&format!("word{:04} ", i));
            i += 1;
        }
        out.truncate(chars);
        out.into_bytes()
    }

    #[tokio::test]
    async fn successful_run_persists_contiguous_chunks() {
        let fixture = fixture_with(StubEmbedder::ok(), &prose(2500), "text/plain");

        let outcome = fixture.processor.process(fixture.document_id).await.unwrap();

        assert_eq!(outcome.status, DocumentStatus::Processed);
        assert!(outcome.success());
        assert_eq!(outcome.total_chunks, 3);
        assert_eq!(outcome.chunks_processed, 3);

        let stored = fixture.store.chunks_for(fixture.document_id);
        assert_eq!(stored.len(), outcome.chunks_processed);
        for (expected, chunk) in stored.iter().enumerate() {
            assert_eq!(chunk.chunk_index, expected);
            assert_eq!(chunk.metadata.position, expected);
        }

        let document = fixture.store.document(fixture.document_id).unwrap();
        assert_eq!(document.status, DocumentStatus::Processed);
        assert_eq!(document.chunk_count, stored.len());
        assert!(document.processed_at.is_some());
    }

    #[tokio::test]
    async fn reprocessing_replaces_the_chunk_set() {
        let fixture = fixture_with(StubEmbedder::ok(), &prose(2500), "text/plain");

        fixture.processor.process(fixture.document_id).await.unwrap();
        let first = fixture.store.chunks_for(fixture.document_id);

        let outcome = fixture.processor.process(fixture.document_id).await.unwrap();
        let second = fixture.store.chunks_for(fixture.document_id);

        assert_eq!(first.len(), second.len());
        assert_eq!(second.len(), outcome.chunks_processed);
        // Only one run's chunks survive: indices are contiguous 0..n.
        for (expected, chunk) in second.iter().enumerate() {
            assert_eq!(chunk.chunk_index, expected);
        }
    }

    #[tokio::test]
    async fn short_extracted_text_fails_the_run() {
        let fixture = fixture_with(StubEmbedder::ok(), b"tiny!", "text/plain");

        let err = fixture.processor.process(fixture.document_id).await.unwrap_err();
        assert!(matches!(err, PipelineError::Extraction { .. }));

        let document = fixture.store.document(fixture.document_id).unwrap();
        assert_eq!(document.status, DocumentStatus::Error);
        assert_eq!(document.chunk_count, 0);
        assert!(document.processed_at.is_some());
        assert!(fixture.store.chunks_for(fixture.document_id).is_empty());
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let fixture = fixture_with(StubEmbedder::ok(), &prose(2500), "text/plain");

        let err = fixture.processor.process(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[tokio::test]
    async fn missing_object_forces_error_state() {
        let fixture = fixture_with(StubEmbedder::ok(), &prose(2500), "text/plain");

        // Point the document at a path that has no stored object.
        let mut document = fixture.store.document(fixture.document_id).unwrap();
        document.file_path = "missing/object".to_string();
        fixture.store.insert_document(document);

        let err = fixture.processor.process(fixture.document_id).await.unwrap_err();
        assert!(matches!(err, PipelineError::Download { .. }));
        let document = fixture.store.document(fixture.document_id).unwrap();
        assert_eq!(document.status, DocumentStatus::Error);
    }

    #[tokio::test]
    async fn one_failed_embedding_skips_only_that_chunk() {
        let fixture = fixture_with(StubEmbedder::failing_on(vec![1]), &prose(2500), "text/plain");

        let outcome = fixture.processor.process(fixture.document_id).await.unwrap();

        assert_eq!(outcome.status, DocumentStatus::Processed);
        assert_eq!(outcome.total_chunks, 3);
        assert_eq!(outcome.chunks_processed, 2);

        let stored = fixture.store.chunks_for(fixture.document_id);
        assert_eq!(stored.len(), 2);
        for (expected, chunk) in stored.iter().enumerate() {
            assert_eq!(chunk.chunk_index, expected);
        }

        let document = fixture.store.document(fixture.document_id).unwrap();
        assert_eq!(document.chunk_count, 2);
    }

    #[tokio::test]
    async fn all_embeddings_failing_ends_in_error_state() {
        let fixture = fixture_with(StubEmbedder::always_failing(), &prose(2500), "text/plain");

        let outcome = fixture.processor.process(fixture.document_id).await.unwrap();

        assert_eq!(outcome.status, DocumentStatus::Error);
        assert!(!outcome.success());
        assert_eq!(outcome.chunks_processed, 0);
        assert!(fixture.store.chunks_for(fixture.document_id).is_empty());

        let document = fixture.store.document(fixture.document_id).unwrap();
        assert_eq!(document.status, DocumentStatus::Error);
        assert!(document.processed_at.is_some());
    }

    #[tokio::test]
    async fn csv_documents_route_through_the_table_chunker() {
        let mut csv = String::from("id;name;notes\n");
        for i in 0..60 {
            csv.push_str(&format!(
                "{};product {};a moderately descriptive catalog note\n",
                i, i
            ));
        }
        let fixture = fixture_with(StubEmbedder::ok(), csv.as_bytes(), "text/csv");

        let outcome = fixture.processor.process(fixture.document_id).await.unwrap();
        assert!(outcome.success());

        let stored = fixture.store.chunks_for(fixture.document_id);
        assert!(!stored.is_empty());
        for chunk in &stored {
            assert!(chunk.content.starts_with("id, name, notes"));
        }
    }
}
