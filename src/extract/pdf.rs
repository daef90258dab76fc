//! PDF text extraction via a content-stream reader.

use tracing::debug;

use super::DocumentFormat;
use crate::error::PipelineError;

/// Yield to the executor after this many pages so huge documents do not
/// monopolize a worker thread.
const PDF_YIELD_EVERY: usize = 10;

/// Extract text page by page, concatenated with newline separators.
///
/// A document that fails to load is an extraction error; an individual
/// page that fails text extraction is skipped.
pub(crate) async fn extract_pdf(bytes: &[u8]) -> Result<String, PipelineError> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| PipelineError::extraction(DocumentFormat::Pdf, e.to_string()))?;

    let pages = document.get_pages();
    let mut out = String::new();

    for (seen, (&page_number, _)) in pages.iter().enumerate() {
        match document.extract_text(&[page_number]) {
            Ok(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    out.push_str(text);
                    out.push('\n');
                }
            }
            Err(e) => {
                debug!(page = page_number, error = %e, "Skipping unreadable PDF page");
            }
        }

        if (seen + 1) % PDF_YIELD_EVERY == 0 {
            tokio::task::yield_now().await;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_pdf_is_an_extraction_error() {
        let err = extract_pdf(b"not a pdf at all").await.unwrap_err();
        assert!(matches!(err, PipelineError::Extraction { ref format, .. } if format == "pdf"));
    }
}
