//! Service configuration.

use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_BATCH_PAUSE_MS, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_EMBED_BATCH_SIZE,
    DEFAULT_MAX_RETRIES, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_SLIDE_CHUNK_SIZE,
    DEFAULT_TABLE_CHUNK_SIZE, MIN_CHUNK_CHARS,
};

/// Global service configuration, built once at startup and passed by
/// reference into each component. No ambient globals.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// API key for the embedding and completion services
    pub openai_api_key: String,

    /// Base URL of the model-service API (overridable for tests)
    pub openai_base_url: String,

    /// Embedding model identifier
    pub embedding_model: String,

    /// Chat-completion model identifier
    pub chat_model: String,

    /// Base URL of the relational + vector datastore service
    pub datastore_url: String,

    /// Base URL of the object storage service
    pub storage_url: String,

    /// Chunking budgets shared by all strategies
    pub chunking: ChunkConfig,

    /// Chunks embedded and persisted concurrently per batch
    pub embed_batch_size: usize,

    /// Pause between embedding batches (rate-limit pacing), milliseconds
    pub batch_pause_ms: u64,

    /// Retries per embedding request
    pub max_retries: u32,

    /// Minimum similarity for retrieved chunks
    pub similarity_threshold: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            datastore_url: "http://localhost:8000".to_string(),
            storage_url: "http://localhost:8001".to_string(),
            chunking: ChunkConfig::default(),
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
            batch_pause_ms: DEFAULT_BATCH_PAUSE_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or(defaults.openai_base_url),
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            chat_model: std::env::var("CHAT_MODEL").unwrap_or(defaults.chat_model),
            datastore_url: std::env::var("DATASTORE_URL").unwrap_or(defaults.datastore_url),
            storage_url: std::env::var("STORAGE_URL").unwrap_or(defaults.storage_url),
            chunking: ChunkConfig::from_env(),
            embed_batch_size: env_parse("EMBED_BATCH_SIZE", defaults.embed_batch_size),
            batch_pause_ms: env_parse("BATCH_PAUSE_MS", defaults.batch_pause_ms),
            max_retries: env_parse("EMBED_MAX_RETRIES", defaults.max_retries),
            similarity_threshold: env_parse(
                "SIMILARITY_THRESHOLD",
                defaults.similarity_threshold,
            ),
        }
    }
}

/// Per-run chunking budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Target prose segment size in characters
    pub chunk_size: usize,

    /// Characters of context carried over between prose segments
    pub chunk_overlap: usize,

    /// Size budget for row-accumulated table segments
    pub table_chunk_size: usize,

    /// Size budget for an individual slide segment
    pub slide_chunk_size: usize,

    /// Segments shorter than this are dropped
    pub min_chunk_chars: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            table_chunk_size: DEFAULT_TABLE_CHUNK_SIZE,
            slide_chunk_size: DEFAULT_SLIDE_CHUNK_SIZE,
            min_chunk_chars: MIN_CHUNK_CHARS,
        }
    }
}

impl ChunkConfig {
    /// Load chunking budgets from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            chunk_size: env_parse("CHUNK_SIZE", defaults.chunk_size),
            chunk_overlap: env_parse("CHUNK_OVERLAP", defaults.chunk_overlap),
            table_chunk_size: env_parse("TABLE_CHUNK_SIZE", defaults.table_chunk_size),
            slide_chunk_size: env_parse("SLIDE_CHUNK_SIZE", defaults.slide_chunk_size),
            min_chunk_chars: env_parse("MIN_CHUNK_CHARS", defaults.min_chunk_chars),
        }
    }

    /// Create a config with the given prose chunk size.
    pub fn with_size(size: usize) -> Self {
        Self {
            chunk_size: size,
            ..Default::default()
        }
    }

    /// Set the prose overlap.
    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.chunk_overlap = overlap;
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
