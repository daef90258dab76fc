//! Base trait and shared text normalization for all chunkers.

use crate::types::ChunkConfig;

/// The core trait that all chunking strategies implement.
///
/// A chunker splits extracted text into bounded segments suitable for
/// embedding and retrieval. Strategies are pure and deterministic:
/// the same normalized text with the same budgets always yields the
/// same segment boundaries.
pub trait Chunker: Send + Sync {
    /// Get the name of this chunker.
    fn name(&self) -> &'static str;

    /// Split the given text into ordered segments.
    fn chunk(&self, text: &str, config: &ChunkConfig) -> Vec<String>;

    /// Get the description of this chunker.
    fn description(&self) -> &'static str {
        "A text chunker"
    }
}

/// Normalize text before chunking.
///
/// Strips null and control characters, collapses whitespace runs and
/// trims. Newlines survive as the collapsed form of any whitespace run
/// that contains one, so row- and boundary-aware strategies keep their
/// line structure.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_ws = false;
    let mut pending_newline = false;

    for c in text.chars() {
        let c = if c == '\r' { '\n' } else { c };
        if c != '\n' && c != '\t' && (c == '\0' || c.is_control()) {
            continue;
        }
        if c.is_whitespace() {
            pending_ws = true;
            if c == '\n' {
                pending_newline = true;
            }
            continue;
        }
        if pending_ws && !out.is_empty() {
            out.push(if pending_newline { '\n' } else { ' ' });
        }
        pending_ws = false;
        pending_newline = false;
        out.push(c);
    }

    out
}

/// Drop segments below the minimum viable size.
pub(crate) fn drop_short_segments(segments: Vec<String>, min_chars: usize) -> Vec<String> {
    segments
        .into_iter()
        .filter(|s| s.chars().count() >= min_chars)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_null_and_control_characters() {
        let text = "hea\u{0}der\u{1}\u{7f} body";
        assert_eq!(normalize(text), "header body");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(normalize("a   b\t\t c"), "a b c");
    }

    #[test]
    fn newline_survives_collapsed_runs() {
        assert_eq!(normalize("row one  \n\n  row two"), "row one\nrow two");
        assert_eq!(normalize("a \r\n b"), "a\nb");
    }

    #[test]
    fn trims_both_ends() {
        assert_eq!(normalize("  \n padded \n  "), "padded");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize("x \u{0}\u{3} y\n\n z\t");
        assert_eq!(normalize(&once), once);
    }
}
