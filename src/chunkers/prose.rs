//! Generic prose chunker with overlap and word-boundary awareness.

use super::base::{drop_short_segments, normalize, Chunker};
use crate::types::ChunkConfig;

/// Characters that may end a segment without cutting a word.
const BOUNDARY_CHARS: [char; 3] = [' ', '.', '\n'];

/// Greedy forward-scan chunker for prose content.
///
/// Segments target `chunk_size` characters and overlap by
/// `chunk_overlap`. A boundary landing mid-word walks back to the
/// nearest preceding space, period or newline, but never further back
/// than the overlap distance into the segment; with no boundary in
/// that window the segment is cut hard at the target size.
pub struct ProseChunker;

impl ProseChunker {
    /// Create a new prose chunker.
    pub fn new() -> Self {
        Self
    }

    /// Split already-normalized text into overlapping segments.
    pub(crate) fn split_normalized(
        &self,
        text: &str,
        size: usize,
        overlap: usize,
        min_chars: usize,
    ) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();

        if total == 0 {
            return Vec::new();
        }
        if total <= size {
            return drop_short_segments(vec![text.to_string()], min_chars);
        }

        let mut segments = Vec::new();
        let mut start = 0usize;

        while start < total {
            let hard_end = (start + size).min(total);
            let end = if hard_end == total {
                total
            } else {
                self.walk_back_to_boundary(&chars, start, hard_end, overlap)
            };

            let segment: String = chars[start..end].iter().collect();
            let segment = segment.trim().to_string();
            if !segment.is_empty() {
                segments.push(segment);
            }

            if end == total {
                break;
            }
            let next = end.saturating_sub(overlap);
            start = if next > start { next } else { start + 1 };
        }

        drop_short_segments(segments, min_chars)
    }

    /// Find the cut position for a segment ending mid-word.
    ///
    /// Walks backward from the hard end to the nearest boundary char,
    /// stopping no earlier than `overlap` characters into the segment.
    fn walk_back_to_boundary(
        &self,
        chars: &[char],
        start: usize,
        hard_end: usize,
        overlap: usize,
    ) -> usize {
        if BOUNDARY_CHARS.contains(&chars[hard_end - 1]) {
            return hard_end;
        }
        let floor = start + overlap;
        let mut cut = hard_end - 1;
        while cut > floor {
            if BOUNDARY_CHARS.contains(&chars[cut - 1]) {
                return cut;
            }
            cut -= 1;
        }
        hard_end
    }
}

impl Default for ProseChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for ProseChunker {
    fn name(&self) -> &'static str {
        "prose"
    }

    fn description(&self) -> &'static str {
        "Greedy forward scan with overlap and word-boundary backtracking"
    }

    fn chunk(&self, text: &str, config: &ChunkConfig) -> Vec<String> {
        let normalized = normalize(text);
        self.split_normalized(
            &normalized,
            config.chunk_size,
            config.chunk_overlap,
            config.min_chunk_chars,
        )
    }
}
