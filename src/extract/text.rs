//! Plain and delimited text decoding.

/// Candidate delimiters, probed by frequency on the leading lines.
const DELIMITER_CANDIDATES: [char; 3] = [',', ';', '\t'];

/// Lines sampled when detecting the delimiter.
const DELIMITER_SAMPLE_LINES: usize = 8;

/// Decode bytes as UTF-8, falling back to Latin-1.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    match String::from_utf8(bytes.to_vec()) {
        Ok(text) => text,
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Decode delimited text and re-emit it one row per line with cells
/// joined by `", "`, so downstream chunking sees a canonical table.
pub(crate) fn extract_delimited(bytes: &[u8]) -> String {
    let text = decode_text(bytes);
    let delimiter = detect_delimiter(&text);

    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.split(delimiter)
                .map(str::trim)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pick the delimiter among comma, semicolon and tab by counting
/// occurrences over the leading lines. Comma wins ties.
pub fn detect_delimiter(text: &str) -> char {
    let sample: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(DELIMITER_SAMPLE_LINES)
        .collect();

    let mut best = DELIMITER_CANDIDATES[0];
    let mut best_count = 0usize;
    for candidate in DELIMITER_CANDIDATES {
        let count = sample
            .iter()
            .map(|line| line.matches(candidate).count())
            .sum();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_decoding() {
        assert_eq!(decode_text("héllo".as_bytes()), "héllo");
    }

    #[test]
    fn latin1_fallback() {
        // 0xE9 is 'é' in Latin-1 but invalid as a standalone UTF-8 byte.
        let bytes = [b'c', b'a', b'f', 0xE9];
        assert_eq!(decode_text(&bytes), "café");
    }

    #[test]
    fn detects_semicolon_delimiter() {
        let text = "name;price;stock\nwidget;9,50;3\ngadget;12,00;7\n";
        assert_eq!(detect_delimiter(text), ';');
    }

    #[test]
    fn detects_tab_delimiter() {
        let text = "name\tprice\nwidget\t9.50\n";
        assert_eq!(detect_delimiter(text), '\t');
    }

    #[test]
    fn comma_wins_ties() {
        assert_eq!(detect_delimiter("plain text without delimiters"), ',');
    }

    #[test]
    fn delimited_rows_are_canonicalized() {
        let text = extract_delimited(b"name;price\nwidget ; 9.50\n\ngadget;12\n");
        assert_eq!(text, "name, price\nwidget, 9.50\ngadget, 12");
    }
}
