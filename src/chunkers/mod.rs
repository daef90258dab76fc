//! Content-aware chunking strategies.

pub mod base;
pub mod prose;
pub mod slides;
pub mod table;

use std::sync::Arc;

pub use base::{normalize, Chunker};
pub use prose::ProseChunker;
pub use slides::SlideChunker;
pub use table::TableChunker;

use crate::extract::{DocumentFormat, FormatFamily};

/// Router that selects the chunking strategy for a document format.
pub struct ChunkingRouter {
    prose: Arc<ProseChunker>,
    table: Arc<TableChunker>,
    slides: Arc<SlideChunker>,
}

impl ChunkingRouter {
    /// Create a new chunking router.
    pub fn new() -> Self {
        Self {
            prose: Arc::new(ProseChunker::new()),
            table: Arc::new(TableChunker::new()),
            slides: Arc::new(SlideChunker::new()),
        }
    }

    /// Get the chunker for the given document format.
    pub fn for_format(&self, format: DocumentFormat) -> Arc<dyn Chunker> {
        match format.family() {
            FormatFamily::Tabular => Arc::clone(&self.table) as Arc<dyn Chunker>,
            FormatFamily::Slides => Arc::clone(&self.slides) as Arc<dyn Chunker>,
            FormatFamily::Prose => Arc::clone(&self.prose) as Arc<dyn Chunker>,
        }
    }
}

impl Default for ChunkingRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_format_family() {
        let router = ChunkingRouter::new();
        assert_eq!(router.for_format(DocumentFormat::Csv).name(), "table");
        assert_eq!(router.for_format(DocumentFormat::Xlsx).name(), "table");
        assert_eq!(router.for_format(DocumentFormat::Pptx).name(), "slides");
        assert_eq!(router.for_format(DocumentFormat::Pdf).name(), "prose");
        assert_eq!(router.for_format(DocumentFormat::Unknown).name(), "prose");
    }
}
