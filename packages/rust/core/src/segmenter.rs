//! Regulatory section and numbered task segmentation.
//!
//! Regulatory headings are recognized by an ordered rule table. Primary rules
//! always open a section; secondary (looser) rules only open a section for a
//! letter no primary rule matched anywhere in the document, so a stray
//! `C.Something` line cannot split a section that already has a real heading.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use rfpintel_shared::{SectionKey, SectionMap, SegmentationConfig, Task};

use crate::requirements::RequirementExtractor;

// ---------------------------------------------------------------------------
// Heading rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleStrength {
    Primary,
    Secondary,
}

/// One regulatory heading pattern. Capture group 1 is the section letter.
#[derive(Debug, Clone)]
pub struct HeadingRule {
    pub name: &'static str,
    pub strength: RuleStrength,
    pub pattern: Regex,
}

impl HeadingRule {
    fn key(&self, line: &str) -> Option<SectionKey> {
        let caps = self.pattern.captures(line)?;
        let letter = caps.get(1)?.as_str().chars().next()?;
        SectionKey::new(letter)
    }
}

static DEFAULT_RULES: LazyLock<Vec<HeadingRule>> = LazyLock::new(|| {
    vec![
        HeadingRule {
            name: "section-keyword",
            strength: RuleStrength::Primary,
            pattern: Regex::new(r"(?i)\bSECTION\s+([A-M])\b").expect("valid regex"),
        },
        HeadingRule {
            name: "letter-title",
            strength: RuleStrength::Primary,
            pattern: Regex::new(r"^\s*([A-M])\.\s+[^a-z\s]").expect("valid regex"),
        },
        HeadingRule {
            name: "loose-letter",
            strength: RuleStrength::Secondary,
            pattern: Regex::new(r"^\s*([A-M])\.\s*[A-Z][A-Za-z]+").expect("valid regex"),
        },
    ]
});

/// Lettered headings must carry an all-caps title. Body list items like
/// `A. Technical volume` no longer open a section.
static STRICT_RULES: LazyLock<Vec<HeadingRule>> = LazyLock::new(|| {
    vec![
        HeadingRule {
            name: "section-keyword",
            strength: RuleStrength::Primary,
            pattern: Regex::new(r"(?i)\bSECTION\s+([A-M])\b").expect("valid regex"),
        },
        HeadingRule {
            name: "caps-letter-title",
            strength: RuleStrength::Primary,
            pattern: Regex::new(r"^\s*([A-M])\.\s*[A-Z][^a-z]*[A-Z][^a-z]*$").expect("valid regex"),
        },
    ]
});

// ---------------------------------------------------------------------------
// Regulatory segmentation
// ---------------------------------------------------------------------------

/// Splits document text into lettered regulatory sections.
#[derive(Debug, Clone)]
pub struct SectionSegmenter {
    rules: Vec<HeadingRule>,
}

impl SectionSegmenter {
    pub fn new() -> Self {
        Self::with_rules(DEFAULT_RULES.clone())
    }

    /// Only keyword headings and all-caps lettered titles open sections.
    pub fn strict() -> Self {
        Self::with_rules(STRICT_RULES.clone())
    }

    pub fn from_config(config: &SegmentationConfig) -> Self {
        if config.strict_headings {
            Self::strict()
        } else {
            Self::new()
        }
    }

    /// Use a custom rule table. Rules are evaluated in order.
    pub fn with_rules(rules: Vec<HeadingRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[HeadingRule] {
        &self.rules
    }

    /// Segment `text` into a [`SectionMap`] holding every recognized key.
    ///
    /// Lines before the first heading belong to no section. A heading for a
    /// key that is already open continues that key's buffer.
    #[instrument(skip_all, fields(chars = text.len()))]
    pub fn segment(&self, text: &str) -> SectionMap {
        let lines: Vec<&str> = text.lines().collect();

        // Pass 1: letters claimed by a primary rule anywhere in the text.
        let primary_keys: HashSet<SectionKey> = lines
            .iter()
            .filter_map(|line| self.match_primary(line))
            .collect();

        // Pass 2: route lines into buffers.
        let mut buffers: BTreeMap<SectionKey, Vec<&str>> = BTreeMap::new();
        let mut current: Option<SectionKey> = None;

        for line in &lines {
            if let Some(key) = self.heading_key(line, &primary_keys) {
                current = Some(key);
            }
            if let Some(key) = current {
                buffers.entry(key).or_default().push(line.trim());
            }
        }

        let mut map = SectionMap::empty();
        for (key, lines) in buffers {
            let body = lines.join("\n").trim_end_matches('\n').to_string();
            map.insert(key, body);
        }

        debug!(
            sections = map.populated().count(),
            primary = primary_keys.len(),
            "regulatory segmentation complete"
        );

        map
    }

    fn match_primary(&self, line: &str) -> Option<SectionKey> {
        self.rules
            .iter()
            .filter(|r| r.strength == RuleStrength::Primary)
            .find_map(|r| r.key(line))
    }

    /// Which section `line` opens, if any, given the primary-claimed letters.
    fn heading_key(&self, line: &str, primary_keys: &HashSet<SectionKey>) -> Option<SectionKey> {
        self.rules.iter().find_map(|rule| {
            let key = rule.key(line)?;
            match rule.strength {
                RuleStrength::Primary => Some(key),
                RuleStrength::Secondary if !primary_keys.contains(&key) => Some(key),
                RuleStrength::Secondary => None,
            }
        })
    }
}

impl Default for SectionSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Segment with the built-in rule table.
pub fn segment_sections(text: &str) -> SectionMap {
    SectionSegmenter::new().segment(text)
}

// ---------------------------------------------------------------------------
// Task segmentation
// ---------------------------------------------------------------------------

static TASK_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+\.\d+)\s+([A-Z].*)$").expect("valid regex"));

const MAX_TITLE_WORDS: usize = 12;

/// Words that start a sentence rather than continue a title.
const DETERMINERS: &[&str] = &["The", "A", "An", "This", "Each", "All"];

struct OpenTask<'a> {
    number: &'a str,
    title: String,
    body: Vec<&'a str>,
}

/// Split `text` at `<int>.<int> Title` headings and attach obligation
/// sentences from each task's body.
#[instrument(skip_all, fields(chars = text.len()))]
pub fn segment_tasks(text: &str, extractor: &RequirementExtractor) -> Vec<Task> {
    let mut open: Vec<OpenTask<'_>> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = TASK_HEADING_RE.captures(line) {
            let (Some(number), Some(rest)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let rest = rest.as_str();
            let (title, body_start) = match rest.split_once(':') {
                Some((title, after)) => (title.trim().to_string(), after),
                None => (title_without_colon(rest), rest),
            };
            open.push(OpenTask {
                number: number.as_str(),
                title,
                body: vec![body_start],
            });
        } else if let Some(task) = open.last_mut() {
            task.body.push(line);
        }
    }

    let tasks: Vec<Task> = open
        .into_iter()
        .map(|task| {
            let body = task.body.join("\n");
            let sentences = extractor.obligation_units(&body);
            Task {
                number: task.number.to_string(),
                title: task.title,
                requirements: (!sentences.is_empty()).then(|| sentences.join(" ")),
            }
        })
        .collect();

    debug!(tasks = tasks.len(), "task segmentation complete");
    tasks
}

/// Title for a heading without a colon.
///
/// Takes the leading run of capitalized words (stopping after a word that ends
/// a sentence) and hands a trailing determiner back to the body. If nothing
/// survives, falls back to the first sentence.
fn title_without_colon(rest: &str) -> String {
    let mut run: Vec<&str> = Vec::new();
    for word in rest.split_whitespace() {
        if !word.chars().next().is_some_and(char::is_uppercase) {
            break;
        }
        run.push(word);
        if word.ends_with(['.', '!', '?']) {
            break;
        }
    }
    while run.last().is_some_and(|w| DETERMINERS.contains(w)) {
        run.pop();
    }

    if run.is_empty() {
        for word in rest.split_whitespace() {
            run.push(word);
            if word.ends_with(['.', '!', '?']) {
                break;
            }
        }
    }

    run.truncate(MAX_TITLE_WORDS);
    run.join(" ")
        .trim_end_matches(['.', '!', '?'])
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
