//! Text extraction for OOXML packages (docx, xlsx, pptx).
//!
//! These formats are zip archives; the relevant inner XML parts are
//! located by name and their text nodes collected with a structural
//! event scan. `quick-xml` unescapes the standard XML entities.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{DocumentFormat, SLIDE_SEPARATOR};
use crate::error::PipelineError;

/// Maximum decompressed bytes read from a single archive entry.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extract the document body text from a docx package.
///
/// Reads `word/document.xml` and collects `<w:t>` runs; paragraph ends
/// become newlines. A missing body part fails the run.
pub(crate) fn extract_docx(bytes: &[u8]) -> Result<String, PipelineError> {
    let format = DocumentFormat::Docx;
    let mut archive = open_archive(bytes, format)?;
    let body = read_entry(&mut archive, "word/document.xml", format)?;
    collect_text_runs(&body, format)
}

/// Extract slide text from a pptx package.
///
/// Slides are read in numeric order and joined with [`SLIDE_SEPARATOR`]
/// so the chunker can align on slide boundaries.
pub(crate) fn extract_pptx(bytes: &[u8]) -> Result<String, PipelineError> {
    let format = DocumentFormat::Pptx;
    let mut archive = open_archive(bytes, format)?;

    let slide_names = numbered_entries(&archive, "ppt/slides/slide", ".xml");
    if slide_names.is_empty() {
        return Err(PipelineError::extraction(format, "no slide parts found"));
    }

    let mut slides = Vec::new();
    for name in slide_names {
        let xml = read_entry(&mut archive, &name, format)?;
        let text = collect_text_runs(&xml, format)?;
        slides.push(text.trim().to_string());
    }

    Ok(slides.join(&format!("\n{}\n", SLIDE_SEPARATOR)))
}

/// Extract cell text from an xlsx package.
///
/// Shared-string indices are resolved back to literal text; every sheet
/// is prefixed with a `[SheetName]` marker line and emitted one row per
/// line with cells joined by `", "`.
pub(crate) fn extract_xlsx(bytes: &[u8]) -> Result<String, PipelineError> {
    let format = DocumentFormat::Xlsx;
    let mut archive = open_archive(bytes, format)?;

    let shared_strings = match read_optional_entry(&mut archive, "xl/sharedStrings.xml") {
        Some(xml) => parse_shared_strings(&xml, format)?,
        None => Vec::new(),
    };
    let sheet_titles = match read_optional_entry(&mut archive, "xl/workbook.xml") {
        Some(xml) => parse_sheet_titles(&xml, format)?,
        None => Vec::new(),
    };

    let sheet_names = numbered_entries(&archive, "xl/worksheets/sheet", ".xml");
    if sheet_names.is_empty() {
        return Err(PipelineError::extraction(format, "no worksheet parts found"));
    }

    let mut out = String::new();
    for (index, name) in sheet_names.into_iter().enumerate() {
        let xml = read_entry(&mut archive, &name, format)?;
        let rows = parse_sheet_rows(&xml, &shared_strings, format)?;

        let title = sheet_titles
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Sheet {}", index + 1));
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("[{}]", title));
        for row in rows {
            out.push('\n');
            out.push_str(&row);
        }
    }

    Ok(out)
}

fn open_archive(
    bytes: &[u8],
    format: DocumentFormat,
) -> Result<zip::ZipArchive<Cursor<&[u8]>>, PipelineError> {
    zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| PipelineError::extraction(format, format!("not a valid archive: {}", e)))
}

fn read_entry(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    name: &str,
    format: DocumentFormat,
) -> Result<Vec<u8>, PipelineError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| PipelineError::extraction(format, format!("missing part {}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| PipelineError::extraction(format, format!("unreadable part {}: {}", name, e)))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(PipelineError::extraction(
            format,
            format!("part {} exceeds the size limit", name),
        ));
    }
    Ok(out)
}

fn read_optional_entry(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Option<Vec<u8>> {
    let entry = archive.by_name(name).ok()?;
    let mut out = Vec::new();
    entry.take(MAX_XML_ENTRY_BYTES).read_to_end(&mut out).ok()?;
    Some(out)
}

/// List archive entries named `{prefix}{N}{suffix}`, sorted by `N`.
fn numbered_entries(
    archive: &zip::ZipArchive<Cursor<&[u8]>>,
    prefix: &str,
    suffix: &str,
) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with(prefix) && n.ends_with(suffix))
        .map(|n| n.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches(prefix)
            .trim_end_matches(suffix)
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

/// Collect `<t>` text runs from a word-processing or drawing XML part,
/// turning paragraph ends into newlines.
fn collect_text_runs(xml: &[u8], format: DocumentFormat) -> Result<String, PipelineError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut out = String::new();
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(t)) if in_text => {
                out.push_str(t.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if !out.ends_with('\n') && !out.is_empty() {
                        out.push('\n');
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PipelineError::extraction(
                    format,
                    format!("malformed XML: {}", e),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

/// Parse `xl/sharedStrings.xml` into an index-addressable string table.
fn parse_shared_strings(
    xml: &[u8],
    format: DocumentFormat,
) -> Result<Vec<String>, PipelineError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut strings = Vec::new();
    let mut buf = Vec::new();
    let mut in_si = false;
    let mut in_text = false;
    let mut current = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_text = true,
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                current.push_str(t.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PipelineError::extraction(
                    format,
                    format!("malformed shared strings: {}", e),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Parse sheet display names from `xl/workbook.xml`, in workbook order.
fn parse_sheet_titles(xml: &[u8], format: DocumentFormat) -> Result<Vec<String>, PipelineError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut titles = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"name" {
                        titles.push(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PipelineError::extraction(
                    format,
                    format!("malformed workbook: {}", e),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(titles)
}

/// What a `<c>` cell's value element holds.
#[derive(Clone, Copy, PartialEq)]
enum CellKind {
    Literal,
    SharedString,
    InlineString,
}

/// Parse one worksheet into rows of `", "`-joined cell text.
fn parse_sheet_rows(
    xml: &[u8],
    shared_strings: &[String],
    format: DocumentFormat,
) -> Result<Vec<String>, PipelineError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut rows = Vec::new();
    let mut buf = Vec::new();
    let mut cells: Vec<String> = Vec::new();
    let mut kind = CellKind::Literal;
    let mut in_value = false;
    let mut in_inline_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => cells.clear(),
                b"c" => {
                    kind = cell_kind(&e);
                }
                b"v" => in_value = true,
                b"t" if kind == CellKind::InlineString => in_inline_text = true,
                _ => {}
            },
            Ok(Event::Text(t)) => {
                let value = t.unescape().unwrap_or_default();
                let value = value.trim();
                if value.is_empty() {
                    // skip
                } else if in_value {
                    match kind {
                        CellKind::SharedString => {
                            if let Ok(index) = value.parse::<usize>() {
                                if let Some(s) = shared_strings.get(index) {
                                    cells.push(s.clone());
                                }
                            }
                        }
                        _ => cells.push(value.to_string()),
                    }
                } else if in_inline_text {
                    cells.push(value.to_string());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"row" => {
                    if !cells.is_empty() {
                        rows.push(cells.join(", "));
                    }
                    cells.clear();
                }
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                b"c" => kind = CellKind::Literal,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PipelineError::extraction(
                    format,
                    format!("malformed worksheet: {}", e),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(rows)
}

fn cell_kind(cell: &quick_xml::events::BytesStart<'_>) -> CellKind {
    for attr in cell.attributes().flatten() {
        if attr.key.as_ref() == b"t" {
            return match attr.value.as_ref() {
                b"s" => CellKind::SharedString,
                b"inlineStr" => CellKind::InlineString,
                _ => CellKind::Literal,
            };
        }
    }
    CellKind::Literal
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            for (name, content) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn docx_text_runs_and_entities() {
        let body = r#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Terms &amp; conditions</w:t></w:r></w:p>
    <w:p><w:r><w:t>Second &lt;paragraph&gt;</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        let bytes = build_archive(&[("word/document.xml", body)]);

        let text = extract_docx(&bytes).unwrap();
        assert!(text.contains("Terms & conditions"));
        assert!(text.contains("Second <paragraph>"));
    }

    #[test]
    fn docx_missing_body_part_fails() {
        let bytes = build_archive(&[("word/other.xml", "<w:t>ignored</w:t>")]);
        let err = extract_docx(&bytes).unwrap_err();
        assert!(matches!(err, PipelineError::Extraction { .. }));
        assert!(err.to_string().contains("word/document.xml"));
    }

    #[test]
    fn docx_invalid_archive_fails() {
        let err = extract_docx(b"not a zip").unwrap_err();
        assert!(matches!(err, PipelineError::Extraction { .. }));
    }

    #[test]
    fn pptx_slides_joined_with_separator() {
        let slide = |text: &str| {
            format!(
                r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
  <a:p><a:r><a:t>{}</a:t></a:r></a:p>
</p:sld>"#,
                text
            )
        };
        let one = slide("First slide");
        let two = slide("Second slide");
        let bytes = build_archive(&[
            ("ppt/slides/slide2.xml", two.as_str()),
            ("ppt/slides/slide1.xml", one.as_str()),
        ]);

        let text = extract_pptx(&bytes).unwrap();
        let parts: Vec<&str> = text.split(SLIDE_SEPARATOR).collect();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].contains("First slide"));
        assert!(parts[1].contains("Second slide"));
    }

    #[test]
    fn xlsx_resolves_shared_strings_with_sheet_marker() {
        let shared = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <si><t>name</t></si>
  <si><t>price</t></si>
  <si><t>widget</t></si>
</sst>"#;
        let workbook = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheets><sheet name="Inventory" sheetId="1"/></sheets>
</workbook>"#;
        let sheet = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row><c t="s"><v>0</v></c><c t="s"><v>1</v></c></row>
    <row><c t="s"><v>2</v></c><c><v>9.50</v></c></row>
  </sheetData>
</worksheet>"#;
        let bytes = build_archive(&[
            ("xl/sharedStrings.xml", shared),
            ("xl/workbook.xml", workbook),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);

        let text = extract_xlsx(&bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "[Inventory]");
        assert_eq!(lines[1], "name, price");
        assert_eq!(lines[2], "widget, 9.50");
    }

    #[test]
    fn xlsx_without_worksheets_fails() {
        let bytes = build_archive(&[("xl/workbook.xml", "<workbook/>")]);
        let err = extract_xlsx(&bytes).unwrap_err();
        assert!(err.to_string().contains("no worksheet parts"));
    }
}
