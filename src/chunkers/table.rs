//! Table chunker for delimited and spreadsheet text.

use super::base::{drop_short_segments, normalize, Chunker};
use crate::types::ChunkConfig;

/// Row-accumulating chunker for tabular content.
///
/// Rows are gathered into a segment until the next row would exceed the
/// table size budget; every continuation segment re-prepends the header
/// row (the first row of the table) so each segment stays
/// self-describing.
pub struct TableChunker;

impl TableChunker {
    /// Create a new table chunker.
    pub fn new() -> Self {
        Self
    }
}

impl Default for TableChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for TableChunker {
    fn name(&self) -> &'static str {
        "table"
    }

    fn description(&self) -> &'static str {
        "Accumulates rows under a size budget, repeating the header row"
    }

    fn chunk(&self, text: &str, config: &ChunkConfig) -> Vec<String> {
        let normalized = normalize(text);
        let rows: Vec<&str> = normalized
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect();
        if rows.is_empty() {
            return Vec::new();
        }

        let budget = config.table_chunk_size;
        let header = rows[0];
        let header_chars = header.chars().count();

        let mut segments = Vec::new();
        let mut current = header.to_string();
        let mut current_chars = header_chars;

        for row in &rows[1..] {
            let row_chars = row.chars().count();
            if current_chars + 1 + row_chars > budget && current_chars > header_chars {
                segments.push(current);
                current = format!("{}\n{}", header, row);
                current_chars = header_chars + 1 + row_chars;
            } else {
                current.push('\n');
                current.push_str(row);
                current_chars += 1 + row_chars;
            }
        }
        segments.push(current);

        drop_short_segments(segments, config.min_chunk_chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(rows: usize, cell: &str) -> String {
        let mut out = String::from("id, name, amount");
        for i in 0..rows {
            out.push_str(&format!("\n{}, {}, {}", i, cell, i * 10));
        }
        out
    }

    #[test]
    fn small_table_is_a_single_segment() {
        let chunker = TableChunker::new();
        let text = table(4, "some product name");
        let config = ChunkConfig::default();

        let chunks = chunker.chunk(&text, &config);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("id, name, amount"));
    }

    #[test]
    fn every_segment_begins_with_the_header_row() {
        let chunker = TableChunker::new();
        let text = table(60, "a reasonably long product description cell");
        let config = ChunkConfig::default();

        let chunks = chunker.chunk(&text, &config);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.starts_with("id, name, amount"));
            assert!(chunk.chars().count() <= config.table_chunk_size);
        }
    }

    #[test]
    fn rows_are_not_lost_across_segments() {
        let chunker = TableChunker::new();
        let rows = 40;
        let text = table(rows, "a reasonably long product description cell");
        let config = ChunkConfig::default();

        let chunks = chunker.chunk(&text, &config);
        let data_rows: usize = chunks
            .iter()
            .map(|c| c.lines().count() - 1) // minus the header
            .sum();
        assert_eq!(data_rows, rows);
    }

    #[test]
    fn oversized_single_row_still_produces_a_segment() {
        let chunker = TableChunker::new();
        let long_cell = "x".repeat(2000);
        let text = format!("id, payload\n0, {}", long_cell);
        let config = ChunkConfig::default();

        let chunks = chunker.chunk(&text, &config);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains(&long_cell));
    }

    #[test]
    fn tiny_table_below_minimum_is_dropped() {
        let chunker = TableChunker::new();
        let config = ChunkConfig::default();

        let chunks = chunker.chunk("a, b\n1, 2", &config);
        assert!(chunks.is_empty());
    }
}
