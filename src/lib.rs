//! Docrag Service Library
//!
//! Ingests uploaded documents of heterogeneous formats, converts them into
//! embedded text chunks, and answers questions grounded in retrieved chunks.

pub mod api;
pub mod chunkers;
pub mod clients;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod rag;
pub mod store;
pub mod types;

pub use chunkers::{Chunker, ChunkingRouter};
pub use error::PipelineError;
pub use extract::{DocumentFormat, ExtractedText};
pub use pipeline::{DocumentProcessor, ProcessOutcome};
pub use rag::AnswerComposer;
pub use types::{Category, Chunk, ChunkMetadata, Document, DocumentStatus};

/// Default prose chunk size in characters
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default prose chunk overlap in characters
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Size budget for row-accumulated table chunks
pub const DEFAULT_TABLE_CHUNK_SIZE: usize = 1500;

/// Size budget for individual slide chunks
pub const DEFAULT_SLIDE_CHUNK_SIZE: usize = 800;

/// Segments shorter than this are dropped by every chunking strategy
pub const MIN_CHUNK_CHARS: usize = 50;

/// Extracted text shorter than this fails the document's run
pub const MIN_EXTRACTED_CHARS: usize = 10;

/// Chunks embedded and persisted concurrently per batch
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 10;

/// Pause between embedding batches, in milliseconds
pub const DEFAULT_BATCH_PAUSE_MS: u64 = 250;

/// Retries per embedding request before the chunk is given up on
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Minimum similarity score for retrieved chunks
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;

/// Retrieved chunk cap for chat answers
pub const CHAT_MATCH_COUNT: usize = 5;

/// Retrieved chunk cap for generic search
pub const SEARCH_MATCH_COUNT: usize = 20;
