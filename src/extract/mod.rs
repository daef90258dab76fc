//! Per-format text extraction for uploaded documents.
//!
//! One strategy per content-type family, dispatched over a closed
//! [`DocumentFormat`] enum. Extractors take raw bytes plus the declared
//! MIME type and produce plain text; structural corruption, missing
//! archive parts, or insufficient output fail the document's run.

mod legacy;
mod ooxml;
mod pdf;
mod text;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::MIN_EXTRACTED_CHARS;

pub use legacy::{LEGACY_MIN_LETTER_SEQ, LEGACY_MIN_RUN_CHARS};
pub use text::detect_delimiter;

/// Marker inserted between slides so the chunker can align on slide
/// boundaries. Survives whitespace normalization.
pub const SLIDE_SEPARATOR: &str = "[[SLIDE]]";

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_XLS: &str = "application/vnd.ms-excel";
pub const MIME_PPTX: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const MIME_PPT: &str = "application/vnd.ms-powerpoint";
pub const MIME_CSV: &str = "text/csv";

/// Supported document formats, derived from the declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Doc,
    Xlsx,
    Xls,
    Pptx,
    Ppt,
    Csv,
    Text,
    /// Unrecognized type; handled with a best-effort plain decode
    Unknown,
}

/// Content family a format belongs to, used for chunker selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFamily {
    Prose,
    Tabular,
    Slides,
}

impl DocumentFormat {
    /// Map a declared MIME type onto a format variant.
    pub fn from_content_type(content_type: &str) -> Self {
        let normalized = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_ascii_lowercase();
        match normalized.as_str() {
            MIME_PDF => DocumentFormat::Pdf,
            MIME_DOCX => DocumentFormat::Docx,
            MIME_DOC => DocumentFormat::Doc,
            MIME_XLSX => DocumentFormat::Xlsx,
            MIME_XLS => DocumentFormat::Xls,
            MIME_PPTX => DocumentFormat::Pptx,
            MIME_PPT => DocumentFormat::Ppt,
            MIME_CSV => DocumentFormat::Csv,
            other if other.starts_with("text/") => DocumentFormat::Text,
            _ => DocumentFormat::Unknown,
        }
    }

    /// Content family this format belongs to.
    pub fn family(&self) -> FormatFamily {
        match self {
            DocumentFormat::Xlsx | DocumentFormat::Xls | DocumentFormat::Csv => {
                FormatFamily::Tabular
            }
            DocumentFormat::Pptx | DocumentFormat::Ppt => FormatFamily::Slides,
            _ => FormatFamily::Prose,
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Doc => "doc",
            DocumentFormat::Xlsx => "xlsx",
            DocumentFormat::Xls => "xls",
            DocumentFormat::Pptx => "pptx",
            DocumentFormat::Ppt => "ppt",
            DocumentFormat::Csv => "csv",
            DocumentFormat::Text => "text",
            DocumentFormat::Unknown => "unknown",
        };
        write!(f, "{}", tag)
    }
}

/// Extracted plain text plus the format that produced it.
///
/// Transient value; never persisted independently of its chunks.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub format: DocumentFormat,
}

/// Extract plain text from raw document bytes.
///
/// Fails with [`PipelineError::Extraction`] on structural corruption,
/// missing required archive parts, or output shorter than
/// [`MIN_EXTRACTED_CHARS`]. No partial text is accepted.
pub async fn extract(bytes: &[u8], content_type: &str) -> Result<ExtractedText, PipelineError> {
    let format = DocumentFormat::from_content_type(content_type);

    let text = match format {
        DocumentFormat::Pdf => pdf::extract_pdf(bytes).await?,
        DocumentFormat::Docx => ooxml::extract_docx(bytes)?,
        DocumentFormat::Xlsx => ooxml::extract_xlsx(bytes)?,
        DocumentFormat::Pptx => ooxml::extract_pptx(bytes)?,
        DocumentFormat::Doc | DocumentFormat::Xls | DocumentFormat::Ppt => {
            legacy::scrape_text(bytes, format)
        }
        DocumentFormat::Csv => text::extract_delimited(bytes),
        DocumentFormat::Text | DocumentFormat::Unknown => text::decode_text(bytes),
    };

    if text.trim().chars().count() < MIN_EXTRACTED_CHARS {
        return Err(PipelineError::extraction(
            format,
            format!(
                "extracted text shorter than {} characters",
                MIN_EXTRACTED_CHARS
            ),
        ));
    }

    Ok(ExtractedText { text, format })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_mapping() {
        assert_eq!(
            DocumentFormat::from_content_type("application/pdf"),
            DocumentFormat::Pdf
        );
        assert_eq!(
            DocumentFormat::from_content_type(MIME_DOCX),
            DocumentFormat::Docx
        );
        assert_eq!(
            DocumentFormat::from_content_type("text/csv; charset=utf-8"),
            DocumentFormat::Csv
        );
        assert_eq!(
            DocumentFormat::from_content_type("text/plain"),
            DocumentFormat::Text
        );
        assert_eq!(
            DocumentFormat::from_content_type("application/octet-stream"),
            DocumentFormat::Unknown
        );
    }

    #[test]
    fn family_selection() {
        assert_eq!(DocumentFormat::Xlsx.family(), FormatFamily::Tabular);
        assert_eq!(DocumentFormat::Csv.family(), FormatFamily::Tabular);
        assert_eq!(DocumentFormat::Pptx.family(), FormatFamily::Slides);
        assert_eq!(DocumentFormat::Pdf.family(), FormatFamily::Prose);
        assert_eq!(DocumentFormat::Unknown.family(), FormatFamily::Prose);
    }

    #[tokio::test]
    async fn short_output_fails_extraction() {
        let err = extract(b"tiny", "text/plain").await.unwrap_err();
        assert!(matches!(err, PipelineError::Extraction { .. }));
    }

    #[tokio::test]
    async fn unknown_type_falls_back_to_plain_decode() {
        let extracted = extract(b"plain enough text for the fallback", "application/octet-stream")
            .await
            .unwrap();
        assert_eq!(extracted.format, DocumentFormat::Unknown);
        assert!(extracted.text.contains("fallback"));
    }
}
