//! Slide-based chunker for presentation text.

use super::base::{drop_short_segments, normalize, Chunker};
use super::prose::ProseChunker;
use crate::extract::SLIDE_SEPARATOR;
use crate::types::ChunkConfig;

/// Chunker that aligns segments on slide boundaries.
///
/// Splits on the slide-separator marker first; a slide that still
/// exceeds the slide size budget is recursively split with the generic
/// prose strategy.
pub struct SlideChunker {
    prose: ProseChunker,
}

impl SlideChunker {
    /// Create a new slide chunker.
    pub fn new() -> Self {
        Self {
            prose: ProseChunker::new(),
        }
    }
}

impl Default for SlideChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for SlideChunker {
    fn name(&self) -> &'static str {
        "slides"
    }

    fn description(&self) -> &'static str {
        "Splits on slide boundaries, falling back to prose splitting"
    }

    fn chunk(&self, text: &str, config: &ChunkConfig) -> Vec<String> {
        let normalized = normalize(text);
        let budget = config.slide_chunk_size;

        let mut segments = Vec::new();
        for slide in normalized.split(SLIDE_SEPARATOR) {
            let slide = slide.trim();
            if slide.is_empty() {
                continue;
            }
            if slide.chars().count() <= budget {
                segments.push(slide.to_string());
            } else {
                segments.extend(self.prose.split_normalized(
                    slide,
                    budget,
                    config.chunk_overlap,
                    config.min_chunk_chars,
                ));
            }
        }

        drop_short_segments(segments, config.min_chunk_chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn deck(slides: &[&str]) -> String {
        slides.join(&format!("\n{}\n", SLIDE_SEPARATOR))
    }

    #[test]
    fn one_segment_per_slide() {
        let chunker = SlideChunker::new();
        let text = deck(&[
            "Agenda for the quarterly review meeting with all stakeholders",
            "Revenue grew steadily across every region we operate in today",
        ]);
        let config = ChunkConfig::default();

        let chunks = chunker.chunk(&text, &config);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("Agenda"));
        assert!(chunks[1].starts_with("Revenue"));
        for chunk in &chunks {
            assert!(!chunk.contains(SLIDE_SEPARATOR));
        }
    }

    #[test]
    fn oversized_slide_is_split_with_the_prose_strategy() {
        let chunker = SlideChunker::new();
        let long_slide: String = (0..150)
            .map(|i| format!("point{:03}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let text = deck(&["A short opening slide with the usual title content", &long_slide]);
        let config = ChunkConfig::default();

        let chunks = chunker.chunk(&text, &config);
        assert!(chunks.len() > 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= config.slide_chunk_size);
        }
    }

    #[test]
    fn sub_minimum_slides_are_dropped() {
        let chunker = SlideChunker::new();
        let text = deck(&[
            "Thanks!",
            "A slide with enough narrative content to clear the minimum size",
        ]);
        let config = ChunkConfig::default();

        let chunks = chunker.chunk(&text, &config);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("A slide"));
    }
}
