//! Core type definitions.

mod config;
mod document;

pub use config::{AppConfig, ChunkConfig};
pub use document::{Category, Chunk, ChunkMatch, Document, DocumentStatus};
pub use document::ChunkMetadata;
