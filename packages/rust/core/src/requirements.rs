//! Obligation-bearing requirement extraction.
//!
//! Text is cut into units (sentences inside paragraphs) by an ordered table of
//! boundary rules, then every unit carrying an obligation marker becomes a
//! [`Requirement`]. A separate numbered-list extractor pulls `1.` / `1)` items
//! regardless of markers.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use rfpintel_shared::config::DEFAULT_OBLIGATION_MARKERS;
use rfpintel_shared::{
    ComplianceStatus, NumberedRequirement, Requirement, RequirementsConfig, Result, RfpIntelError,
    SectionKey,
};

// ---------------------------------------------------------------------------
// Marker detection
// ---------------------------------------------------------------------------

static DEFAULT_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_marker_regex(DEFAULT_OBLIGATION_MARKERS.iter().copied()).expect("valid regex")
});

/// Build a case-insensitive, word-bounded alternation over `markers`.
///
/// Multi-word markers match across any run of whitespace.
fn build_marker_regex<'a>(markers: impl Iterator<Item = &'a str>) -> Option<Regex> {
    let alternatives: Vec<String> = markers
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(|m| {
            m.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect();

    if alternatives.is_empty() {
        return None;
    }

    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|"))).ok()
}

/// Detects and extracts obligation-bearing units.
#[derive(Debug, Clone)]
pub struct RequirementExtractor {
    marker_re: Regex,
    max_items: usize,
}

impl RequirementExtractor {
    /// Build an extractor from config. Fails on an empty marker list.
    pub fn new(config: &RequirementsConfig) -> Result<Self> {
        if config.max_items == 0 {
            return Err(RfpIntelError::config("requirements.max_items must be at least 1"));
        }
        let marker_re = build_marker_regex(config.markers.iter().map(String::as_str))
            .ok_or_else(|| {
                RfpIntelError::config("requirements.markers must contain at least one marker")
            })?;
        Ok(Self {
            marker_re,
            max_items: config.max_items,
        })
    }

    /// Same markers, different cap.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items.max(1);
        self
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Whether `unit` contains any obligation marker.
    pub fn is_obligation(&self, unit: &str) -> bool {
        self.marker_re.is_match(unit)
    }

    /// Every obligation-bearing unit in source order, trimmed.
    ///
    /// No deduplication and no cap; task segmentation uses this directly.
    pub fn obligation_units(&self, text: &str) -> Vec<String> {
        split_units(text)
            .into_iter()
            .filter(|unit| self.is_obligation(unit))
            .collect()
    }

    /// Extract requirements from `text`.
    ///
    /// Units are deduplicated case-insensitively (first occurrence wins) and
    /// the result is capped at `max_items`, dropping the tail.
    pub fn extract(&self, text: &str, source_section: Option<SectionKey>) -> Vec<Requirement> {
        let mut seen: HashSet<String> = HashSet::new();
        let requirements: Vec<Requirement> = self
            .obligation_units(text)
            .into_iter()
            .filter(|unit| seen.insert(unit.to_lowercase()))
            .take(self.max_items)
            .map(|unit| Requirement::new(unit, source_section))
            .collect();

        debug!(
            section = ?source_section,
            count = requirements.len(),
            "requirements extracted"
        );

        requirements
    }
}

impl Default for RequirementExtractor {
    fn default() -> Self {
        Self {
            marker_re: DEFAULT_MARKER_RE.clone(),
            max_items: RequirementsConfig::default().max_items,
        }
    }
}

// ---------------------------------------------------------------------------
// Unit splitting
// ---------------------------------------------------------------------------

/// How a line relates to the paragraph being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineRole {
    /// Ends the current paragraph and contributes nothing.
    Break,
    /// Starts a new paragraph (list items, numbered headings).
    Opener,
    /// Is a paragraph on its own (all-caps headings).
    Standalone,
    /// Continues the current paragraph (wrapped text).
    Continuation,
}

static OPENER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\d+(?:\.\d+)+\s|\d+[.)]\s|\(?[A-Za-z0-9]{1,3}\)\s|[A-Za-z]\.\s|[-*\u{2022}\u{25AA}\u{25CF}]\s)")
        .expect("valid regex")
});

/// Boundary rules, evaluated top to bottom; the first match decides.
fn classify_line(line: &str) -> LineRole {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineRole::Break;
    }
    if OPENER_RE.is_match(line) {
        return LineRole::Opener;
    }
    let has_letters = trimmed.chars().any(char::is_alphabetic);
    let has_lowercase = trimmed.chars().any(char::is_lowercase);
    if has_letters && !has_lowercase {
        return LineRole::Standalone;
    }
    LineRole::Continuation
}

/// Group lines into paragraphs (joining wrapped lines), then split sentences.
pub fn split_units(text: &str) -> Vec<String> {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();

    let mut flush = |current: &mut String, paragraphs: &mut Vec<String>| {
        if !current.trim().is_empty() {
            paragraphs.push(std::mem::take(current));
        }
        current.clear();
    };

    for line in text.lines() {
        match classify_line(line) {
            LineRole::Break => flush(&mut current, &mut paragraphs),
            LineRole::Opener => {
                flush(&mut current, &mut paragraphs);
                current.push_str(line.trim());
            }
            LineRole::Standalone => {
                flush(&mut current, &mut paragraphs);
                current.push_str(line.trim());
                flush(&mut current, &mut paragraphs);
            }
            LineRole::Continuation => {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(line.trim());
            }
        }
    }
    flush(&mut current, &mut paragraphs);

    paragraphs
        .iter()
        .flat_map(|p| split_sentences(p))
        .collect()
}

/// Words that end in a period without ending the sentence.
const ABBREVIATIONS: &[&str] = &[
    "no", "nos", "vol", "sec", "para", "art", "fig", "inc", "corp", "ltd", "co", "mr", "mrs",
    "ms", "dr", "st", "vs", "approx", "est", "al", "cf", "ref",
];

/// A period after `word` belongs to an abbreviation (`U.S.`, `e.g.`, `No.`).
fn is_abbreviation(word: &str) -> bool {
    let word = word.trim_start_matches(|c: char| !c.is_alphanumeric());
    if word.is_empty() {
        return false;
    }
    word.contains('.') || ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

/// Split at `.`, `!` or `?` followed by whitespace. Terminators stay attached.
///
/// A period does not split when it closes an abbreviation or when the next
/// word starts lowercase.
fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = paragraph.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some((_, next)) = chars.peek() else {
            continue;
        };
        if !next.is_whitespace() {
            continue;
        }
        let end = idx + c.len_utf8();
        if c == '.' && !is_sentence_end(&paragraph[start..idx], &paragraph[end..]) {
            continue;
        }
        push_trimmed(&mut sentences, &paragraph[start..end]);
        start = end;
    }
    push_trimmed(&mut sentences, &paragraph[start..]);

    sentences
}

fn is_sentence_end(before: &str, after: &str) -> bool {
    let word = before.split_whitespace().next_back().unwrap_or("");
    if is_abbreviation(word) {
        return false;
    }
    !after
        .trim_start()
        .chars()
        .next()
        .is_some_and(char::is_lowercase)
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let trimmed = s.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

// ---------------------------------------------------------------------------
// Numbered lists
// ---------------------------------------------------------------------------

/// Extract `1. text` / `1) text` list items in source order.
pub fn extract_numbered(text: &str) -> Vec<NumberedRequirement> {
    static NUMBERED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^\s*(\d+)[.)]\s+(\S.*?)\s*$").expect("valid regex")
    });

    text.lines()
        .filter_map(|line| NUMBERED_RE.captures(line))
        .map(|caps| NumberedRequirement {
            number: caps[1].to_string(),
            text: caps[2].to_string(),
            compliance_status: ComplianceStatus::NotAddressed,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
