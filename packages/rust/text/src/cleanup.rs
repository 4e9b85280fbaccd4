//! Post-decode cleanup pipeline for extracted document text.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! The pipeline normalizes line endings, page breaks, control characters,
//! and whitespace so the segmenters can work line by line.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on decoded text.
pub(crate) fn run_pipeline(text: &str) -> String {
    let mut result = text.to_string();

    result = normalize_line_endings(&result);
    result = page_breaks_to_newlines(&result);
    result = strip_control_chars(&result);
    result = normalize_whitespace(&result);
    result = clean_blank_lines(&result);
    result = trim_outer_blank_lines(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Line endings
// ---------------------------------------------------------------------------

/// Convert `\r\n` and lone `\r` to `\n`.
fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

// ---------------------------------------------------------------------------
// Pass 2: Page breaks
// ---------------------------------------------------------------------------

/// PDF extractors separate pages with form feeds; the segmenters only see lines.
fn page_breaks_to_newlines(text: &str) -> String {
    text.replace('\x0C', "\n")
}

// ---------------------------------------------------------------------------
// Pass 3: Control characters
// ---------------------------------------------------------------------------

/// Drop control characters other than newline and tab, and the BOM.
fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| *c == '\n' || *c == '\t' || (!c.is_control() && *c != '\u{feff}'))
        .collect()
}

// ---------------------------------------------------------------------------
// Pass 4: Normalize whitespace
// ---------------------------------------------------------------------------

/// Replace non-breaking spaces and trim trailing whitespace on each line.
fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.replace('\u{a0}', " ").trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 5: Clean up excessive blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of 3+ blank lines into exactly 2.
fn clean_blank_lines(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{4,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(text, "\n\n\n").to_string()
}

// ---------------------------------------------------------------------------
// Pass 6: Outer blank lines
// ---------------------------------------------------------------------------

fn trim_outer_blank_lines(text: &str) -> String {
    text.trim_start_matches('\n').trim_end_matches('\n').to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
