//! Core domain types for the RFP document-intelligence pipeline.
//!
//! Everything here is request-scoped: values are produced and consumed within
//! a single pipeline invocation and serialize directly to JSON API payloads.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, RfpIntelError};

// ---------------------------------------------------------------------------
// AnalysisId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one batch run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisId(pub Uuid);

impl AnalysisId {
    /// Generate a new time-sortable analysis identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AnalysisId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RawDocument / ExtractedText
// ---------------------------------------------------------------------------

/// An uploaded document as handed to the pipeline. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    /// File name (used for extension sniffing and reporting).
    pub name: String,
    /// Declared MIME type, if the caller knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Raw bytes.
    #[serde(default)]
    pub content: Vec<u8>,
}

impl RawDocument {
    pub fn new(name: impl Into<String>, media_type: Option<&str>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.map(str::to_string),
            content,
        }
    }

    /// Reject documents that cannot be attributed in results.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RfpIntelError::validation("document name must not be empty"));
        }
        Ok(())
    }

    /// Lowercased file-name extension, if any.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// Decide how the bytes should be turned into text.
    pub fn kind(&self) -> DocumentKind {
        DocumentKind::detect(self.media_type.as_deref(), self.extension().as_deref(), &self.content)
    }
}

/// How a document's bytes are decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Plain-text-like content, decoded directly.
    Text,
    /// PDF, delegated to the extractor chain.
    Pdf,
    /// Anything else; carries the label that was not understood.
    Unsupported(String),
}

const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown", "csv", "tsv", "log"];

impl DocumentKind {
    /// Media type wins, then extension, then magic bytes.
    pub fn detect(media_type: Option<&str>, extension: Option<&str>, content: &[u8]) -> Self {
        if let Some(mt) = media_type.map(|m| m.trim().to_ascii_lowercase()) {
            let essence = mt.split(';').next().unwrap_or_default().trim().to_string();
            if essence == "application/pdf" {
                return Self::Pdf;
            }
            if essence.starts_with("text/") {
                return Self::Text;
            }
            if !essence.is_empty() && essence != "application/octet-stream" {
                return Self::Unsupported(essence);
            }
        }

        if let Some(ext) = extension {
            if ext == "pdf" {
                return Self::Pdf;
            }
            if TEXT_EXTENSIONS.contains(&ext) {
                return Self::Text;
            }
        }

        if content.starts_with(b"%PDF-") {
            return Self::Pdf;
        }

        Self::Unsupported(extension.unwrap_or("unknown").to_string())
    }
}

/// Output of the text normalizer.
///
/// Extraction failure is data, not an error: `text` is empty and `error`
/// carries the message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Decoder or extractor that produced `text`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Whether a page or length cap cut the extraction short.
    #[serde(default)]
    pub truncated: bool,
}

impl ExtractedText {
    pub fn ok(text: impl Into<String>, method: impl Into<String>, truncated: bool) -> Self {
        Self {
            text: text.into(),
            error: None,
            method: Some(method.into()),
            truncated,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            error: Some(error.into()),
            method: None,
            truncated: false,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Uniform Contract Format section letters recognized by the segmenter.
pub const SECTION_KEYS: [char; 13] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M',
];

/// A regulatory section letter (`A` through `M`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SectionKey(char);

impl SectionKey {
    pub const C: SectionKey = SectionKey('C');
    pub const L: SectionKey = SectionKey('L');
    pub const M: SectionKey = SectionKey('M');

    /// Accepts either case; returns `None` outside the recognized range.
    pub fn new(letter: char) -> Option<Self> {
        let upper = letter.to_ascii_uppercase();
        SECTION_KEYS.contains(&upper).then_some(Self(upper))
    }

    pub fn letter(self) -> char {
        self.0
    }

    /// All recognized keys in order.
    pub fn all() -> impl Iterator<Item = SectionKey> {
        SECTION_KEYS.iter().map(|c| SectionKey(*c))
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SectionKey {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                SectionKey::new(c).ok_or_else(|| format!("unrecognized section key '{value}'"))
            }
            _ => Err(format!("section key must be a single letter, got '{value}'")),
        }
    }
}

impl From<SectionKey> for String {
    fn from(key: SectionKey) -> Self {
        key.0.to_string()
    }
}

/// Section letter → concatenated section text.
///
/// Always holds every recognized key; absent sections map to `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionMap(BTreeMap<SectionKey, String>);

impl SectionMap {
    /// A map with every recognized key set to the empty string.
    pub fn empty() -> Self {
        Self(SectionKey::all().map(|k| (k, String::new())).collect())
    }

    pub fn get(&self, key: SectionKey) -> &str {
        self.0.get(&key).map(String::as_str).unwrap_or_default()
    }

    pub fn insert(&mut self, key: SectionKey, text: String) {
        self.0.insert(key, text);
    }

    pub fn iter(&self) -> impl Iterator<Item = (SectionKey, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Keys whose text is non-empty, in letter order.
    pub fn populated(&self) -> impl Iterator<Item = (SectionKey, &str)> {
        self.iter().filter(|(_, text)| !text.is_empty())
    }

    pub fn is_all_empty(&self) -> bool {
        self.populated().next().is_none()
    }
}

impl Default for SectionMap {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// Tasks and requirements
// ---------------------------------------------------------------------------

/// A numbered task heading (`3.1 Title`) and the obligations beneath it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Heading number as written, e.g. `"3.1"`.
    pub number: String,
    pub title: String,
    /// Obligation sentences in source order, or `None` when there are none.
    pub requirements: Option<String>,
}

/// Response progress against a single requirement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    #[default]
    NotAddressed,
    Partial,
    Addressed,
}

/// Normalized requirement identifier: `REQ-` followed by at least three digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementId(String);

impl RequirementId {
    /// Build from a 1-based position or explicit number.
    pub fn from_number(number: u64) -> Self {
        Self(format!("REQ-{number:03}"))
    }

    /// Build from a digit string of any length, dropping leading zeros.
    ///
    /// Returns `None` if `digits` contains anything but ASCII digits.
    pub fn from_digits(digits: &str) -> Option<Self> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let trimmed = digits.trim_start_matches('0');
        let significant = if trimmed.is_empty() { "0" } else { trimmed };
        Some(Self(format!("REQ-{significant:0>3}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequirementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An obligation-bearing unit of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    /// Assigned after extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequirementId>,
    /// Further explicit ids mentioned in the same text.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<RequirementId>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_section: Option<SectionKey>,
    #[serde(default)]
    pub compliance_status: ComplianceStatus,
}

impl Requirement {
    pub fn new(text: impl Into<String>, source_section: Option<SectionKey>) -> Self {
        Self {
            id: None,
            aliases: Vec::new(),
            text: text.into(),
            source_section,
            compliance_status: ComplianceStatus::NotAddressed,
        }
    }
}

/// An item from a `1.` / `1)` numbered list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberedRequirement {
    pub number: String,
    pub text: String,
    #[serde(default)]
    pub compliance_status: ComplianceStatus,
}

/// Requirements grouped by the three sections proposal teams track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceMatrix {
    pub section_l: Vec<Requirement>,
    pub section_m: Vec<Requirement>,
    pub section_c: Vec<Requirement>,
}

impl ComplianceMatrix {
    pub fn total(&self) -> usize {
        self.section_l.len() + self.section_m.len() + self.section_c.len()
    }
}

// ---------------------------------------------------------------------------
// Coverage
// ---------------------------------------------------------------------------

/// Past-performance or other historical material. Read-only input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalDocument {
    pub name: String,
    pub text: String,
}

impl HistoricalDocument {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RfpIntelError::validation(
                "historical document name must not be empty",
            ));
        }
        Ok(())
    }
}

/// One requirement scored against the historical corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityRow {
    pub requirement_id: RequirementId,
    pub requirement_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_match_document: Option<String>,
    /// Fraction of the requirement's significant terms found in the best match.
    pub coverage_score: f64,
    pub capability_area: String,
}

// ---------------------------------------------------------------------------
// Drafting
// ---------------------------------------------------------------------------

/// A proposal section being drafted by an external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDraft {
    /// 1-based position in the outline.
    pub index: u32,
    pub title: String,
    #[serde(default)]
    pub draft: Option<String>,
}

impl SectionDraft {
    pub fn new(index: u32, title: impl Into<String>, draft: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            draft: Some(draft.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn requirement_id_pads_to_three_digits() {
        assert_eq!(RequirementId::from_number(7).as_str(), "REQ-007");
        assert_eq!(RequirementId::from_number(1234).as_str(), "REQ-1234");
        assert_eq!(RequirementId::from_digits("0022").unwrap().as_str(), "REQ-022");
        assert_eq!(RequirementId::from_digits("000").unwrap().as_str(), "REQ-000");
        assert!(RequirementId::from_digits("12a").is_none());
        assert!(RequirementId::from_digits("").is_none());
    }

    #[test]
    fn section_key_accepts_recognized_letters_only() {
        assert_eq!(SectionKey::new('l'), Some(SectionKey::L));
        assert!(SectionKey::new('Z').is_none());
        assert!(SectionKey::try_from("LM".to_string()).is_err());
    }

    #[test]
    fn section_map_always_holds_every_key() {
        let map = SectionMap::empty();
        assert_eq!(map.iter().count(), SECTION_KEYS.len());
        assert!(map.is_all_empty());
        assert_eq!(map.get(SectionKey::L), "");
    }

    #[test]
    fn section_map_serializes_with_letter_keys() {
        let mut map = SectionMap::empty();
        map.insert(SectionKey::L, "SECTION L\nInstructions".into());

        let json = serde_json::to_value(&map).expect("serialize");
        assert_eq!(json["L"], "SECTION L\nInstructions");
        assert_eq!(json["M"], "");

        let parsed: SectionMap = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, map);
    }

    #[test]
    fn requirement_serialization_uses_snake_case_status() {
        let mut req = Requirement::new("The offeror shall submit.", Some(SectionKey::L));
        req.id = Some(RequirementId::from_number(1));

        let json = serde_json::to_value(&req).expect("serialize");
        assert_eq!(json["id"], "REQ-001");
        assert_eq!(json["source_section"], "L");
        assert_eq!(json["compliance_status"], "not_addressed");
        assert!(json.get("aliases").is_none());

        let parsed: Requirement = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, req);
    }

    #[test]
    fn document_kind_detection_order() {
        assert_eq!(
            DocumentKind::detect(Some("application/pdf"), Some("txt"), b""),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentKind::detect(Some("text/plain; charset=utf-8"), None, b""),
            DocumentKind::Text
        );
        assert_eq!(DocumentKind::detect(None, Some("md"), b""), DocumentKind::Text);
        assert_eq!(
            DocumentKind::detect(Some("application/octet-stream"), None, b"%PDF-1.7"),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentKind::detect(None, Some("docx"), b"PK"),
            DocumentKind::Unsupported("docx".into())
        );
    }

    #[test]
    fn raw_document_extension_and_validation() {
        let doc = RawDocument::new("Solicitation.PDF", None, vec![]);
        assert_eq!(doc.extension().as_deref(), Some("pdf"));
        assert!(doc.validate().is_ok());

        let doc = RawDocument::new("  ", None, vec![]);
        assert!(doc.validate().is_err());
        assert_eq!(RawDocument::new(".bashrc", None, vec![]).extension(), None);
    }

    #[test]
    fn extracted_text_failure_has_empty_text() {
        let failed = ExtractedText::failed("no extractor produced text");
        assert!(failed.is_failure());
        assert!(failed.text.is_empty());

        let ok = ExtractedText::ok("body", "utf8", false);
        assert!(!ok.is_failure());
        assert_eq!(ok.method.as_deref(), Some("utf8"));
    }
}
