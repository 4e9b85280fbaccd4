//! Document decoding, extraction fallback, and text cleanup.
//!
//! [`TextNormalizer`] turns a [`RawDocument`] into [`ExtractedText`]. It is the
//! failure boundary of the pipeline: decode and extraction problems come back
//! as `ExtractedText { text: "", error: Some(..) }`, never as an `Err` or panic.

mod cleanup;
pub mod extractors;

use encoding_rs::WINDOWS_1252;
use tracing::{debug, info, instrument, warn};

use rfpintel_shared::{DocumentKind, ExtractedText, ExtractionConfig, RawDocument};

pub use extractors::{
    Extraction, ExtractorChain, LopdfExtractor, PdfExtractExtractor, TextExtractor,
};

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// Decodes raw document bytes into clean, line-oriented text.
pub struct TextNormalizer {
    chain: ExtractorChain,
    limits: ExtractionConfig,
}

impl TextNormalizer {
    /// A normalizer using the built-in PDF extractor chain.
    pub fn new(limits: ExtractionConfig) -> Self {
        Self::with_chain(ExtractorChain::pdf(), limits)
    }

    /// A normalizer using a custom extractor chain for binary formats.
    pub fn with_chain(chain: ExtractorChain, limits: ExtractionConfig) -> Self {
        Self { chain, limits }
    }

    /// Decode `doc` and run the cleanup passes.
    ///
    /// 1. Plain text decodes as UTF-8, falling back to Windows-1252
    /// 2. PDFs go through the extractor chain
    /// 3. Cleanup passes normalize line endings and whitespace
    /// 4. `max_chars` truncates the result
    #[instrument(skip_all, fields(name = %doc.name, bytes = doc.content.len()))]
    pub fn normalize(&self, doc: &RawDocument) -> ExtractedText {
        let kind = doc.kind();
        debug!(?kind, "detected document kind");

        let (raw, method, page_truncated) = match kind {
            DocumentKind::Text => {
                let (text, method) = decode_text(&doc.content);
                (text, method.to_string(), false)
            }
            DocumentKind::Pdf => match self.chain.run(&doc.content, &self.limits) {
                Ok((extraction, method)) => (extraction.text, method, extraction.truncated),
                Err(message) => {
                    warn!(error = %message, "all extractors failed");
                    return ExtractedText::failed(message);
                }
            },
            DocumentKind::Unsupported(label) => {
                warn!(%label, "unsupported document type");
                return ExtractedText::failed(format!("unsupported document type: {label}"));
            }
        };

        let cleaned = cleanup::run_pipeline(&raw);
        let (text, char_truncated) = truncate_chars(cleaned, self.limits.max_chars);
        let truncated = page_truncated || char_truncated;

        info!(
            method = %method,
            chars = text.len(),
            truncated,
            "text normalized"
        );

        ExtractedText::ok(text, method, truncated)
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

/// Normalize a document with the built-in extractor chain.
pub fn normalize(doc: &RawDocument, limits: &ExtractionConfig) -> ExtractedText {
    TextNormalizer::new(limits.clone()).normalize(doc)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Decode plain-text bytes; invalid UTF-8 degrades to Windows-1252, which maps
/// every byte to one char and keeps smart quotes and dashes printable.
fn decode_text(bytes: &[u8]) -> (String, &'static str) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), "utf8"),
        Err(e) => {
            debug!(valid_up_to = e.valid_up_to(), "invalid UTF-8, decoding as Windows-1252");
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            (text.into_owned(), "windows-1252")
        }
    }
}

/// Truncate to at most `max_chars` characters on a char boundary.
fn truncate_chars(text: String, max_chars: Option<usize>) -> (String, bool) {
    let Some(max) = max_chars else {
        return (text, false);
    };
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => (text[..byte_idx].trim_end().to_string(), true),
        None => (text, false),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
