//! Best-effort text scraping for legacy binary Office formats.
//!
//! There is no structural parser for doc/xls/ppt here; the bytes are
//! decoded as Latin-1 and scanned for runs that look like natural
//! language. The thresholds are named constants so tests can probe the
//! edges deterministically.

use lazy_static::lazy_static;
use regex::Regex;

use super::DocumentFormat;

/// Minimum printable-run length kept by the scraper.
pub const LEGACY_MIN_RUN_CHARS: usize = 6;

/// A kept run must contain at least this many consecutive letters.
pub const LEGACY_MIN_LETTER_SEQ: usize = 4;

lazy_static! {
    static ref LETTER_SEQ: Regex =
        Regex::new(&format!(r"[A-Za-zÀ-ÿ]{{{},}}", LEGACY_MIN_LETTER_SEQ)).unwrap();
}

/// Scrape likely-text runs out of a legacy binary document.
///
/// Control bytes split the stream into runs; runs shorter than
/// [`LEGACY_MIN_RUN_CHARS`] or without a letter sequence are discarded.
/// The caller rejects output below the minimum meaningful length.
pub(crate) fn scrape_text(bytes: &[u8], format: DocumentFormat) -> String {
    let _ = format;
    let decoded: String = bytes.iter().map(|&b| b as char).collect();

    let mut runs: Vec<String> = Vec::new();
    let mut current = String::new();
    for c in decoded.chars() {
        if c.is_control() {
            flush_run(&mut current, &mut runs);
        } else {
            current.push(c);
        }
    }
    flush_run(&mut current, &mut runs);

    runs.join("\n")
}

fn flush_run(current: &mut String, runs: &mut Vec<String>) {
    let run = current.trim();
    if run.chars().count() >= LEGACY_MIN_RUN_CHARS && LETTER_SEQ.is_match(run) {
        runs.push(run.to_string());
    }
    current.clear();
}
