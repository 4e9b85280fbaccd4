//! Text extractor trait and the built-in PDF extractors.
//!
//! Extractors are tried in priority order by an [`ExtractorChain`]; the first
//! one that yields usable text wins. A failing extractor (error, panic, or
//! whitespace-only output) hands over to the next.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use rfpintel_shared::{ExtractionConfig, Result, RfpIntelError};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Raw text produced by one extractor, before cleanup.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub text: String,
    /// Whether the page cap stopped extraction early.
    pub truncated: bool,
}

/// A strategy for turning document bytes into text.
pub trait TextExtractor: Send + Sync {
    /// Extract text, honoring the page cap in `limits` where the format allows.
    fn extract(&self, bytes: &[u8], limits: &ExtractionConfig) -> Result<Extraction>;

    /// Human-readable extractor name for tracing and `ExtractedText::method`.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// pdf-extract (primary)
// ---------------------------------------------------------------------------

/// Layout-aware extraction via the `pdf-extract` crate.
///
/// Pages come back separated by form feeds, which is what the page cap cuts on.
pub struct PdfExtractExtractor;

impl TextExtractor for PdfExtractExtractor {
    fn extract(&self, bytes: &[u8], limits: &ExtractionConfig) -> Result<Extraction> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| RfpIntelError::extraction(self.name(), e.to_string()))?;

        let Some(max_pages) = limits.max_pages else {
            return Ok(Extraction {
                text,
                truncated: false,
            });
        };

        let pages: Vec<&str> = text.split('\x0C').collect();
        let truncated = pages.len() > max_pages as usize;
        let text = pages
            .into_iter()
            .take(max_pages as usize)
            .collect::<Vec<_>>()
            .join("\x0C");

        Ok(Extraction { text, truncated })
    }

    fn name(&self) -> &str {
        "pdf-extract"
    }
}

// ---------------------------------------------------------------------------
// lopdf (secondary)
// ---------------------------------------------------------------------------

/// Content-stream text extraction via `lopdf`; tolerant of files that trip
/// up layout analysis.
pub struct LopdfExtractor;

impl TextExtractor for LopdfExtractor {
    fn extract(&self, bytes: &[u8], limits: &ExtractionConfig) -> Result<Extraction> {
        let doc = lopdf::Document::load_mem(bytes)
            .map_err(|e| RfpIntelError::extraction(self.name(), e.to_string()))?;

        let all_pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        let limit = limits
            .max_pages
            .map_or(all_pages.len(), |max| max as usize);
        let truncated = all_pages.len() > limit;
        let pages = &all_pages[..limit.min(all_pages.len())];

        let mut parts = Vec::with_capacity(pages.len());
        for page in pages {
            match doc.extract_text(&[*page]) {
                Ok(text) => parts.push(text),
                Err(e) => debug!(page, error = %e, "lopdf could not read page, skipping"),
            }
        }

        if parts.is_empty() && !pages.is_empty() {
            return Err(RfpIntelError::extraction(
                self.name(),
                "no readable pages",
            ));
        }

        Ok(Extraction {
            text: parts.join("\x0C"),
            truncated,
        })
    }

    fn name(&self) -> &str {
        "lopdf"
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Holds extractors in priority order.
pub struct ExtractorChain {
    extractors: Vec<Box<dyn TextExtractor>>,
}

impl ExtractorChain {
    /// The built-in PDF chain: `pdf-extract`, then `lopdf`.
    pub fn pdf() -> Self {
        Self {
            extractors: vec![Box::new(PdfExtractExtractor), Box::new(LopdfExtractor)],
        }
    }

    /// A chain over caller-supplied extractors (highest priority first).
    pub fn with_extractors(extractors: Vec<Box<dyn TextExtractor>>) -> Self {
        Self { extractors }
    }

    /// Run extractors in order until one yields non-blank text.
    ///
    /// Returns the extraction and the name of the extractor that produced it,
    /// or a message summarizing every failure.
    pub fn run(
        &self,
        bytes: &[u8],
        limits: &ExtractionConfig,
    ) -> std::result::Result<(Extraction, String), String> {
        let mut failures: Vec<String> = Vec::new();

        for extractor in &self.extractors {
            let name = extractor.name().to_string();
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(bytes, limits)));

            match outcome {
                Ok(Ok(extraction)) if !extraction.text.trim().is_empty() => {
                    debug!(extractor = %name, chars = extraction.text.len(), "extraction succeeded");
                    return Ok((extraction, name));
                }
                Ok(Ok(_)) => {
                    warn!(extractor = %name, "extractor returned no text, trying next");
                    failures.push(format!("{name}: no text"));
                }
                Ok(Err(e)) => {
                    warn!(extractor = %name, error = %e, "extractor failed, trying next");
                    failures.push(e.to_string());
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(extractor = %name, panic = %message, "extractor panicked, trying next");
                    failures.push(format!("{name}: panicked: {message}"));
                }
            }
        }

        if failures.is_empty() {
            return Err("no extractors configured".to_string());
        }
        Err(format!("text extraction failed: {}", failures.join("; ")))
    }
}

impl Default for ExtractorChain {
    fn default() -> Self {
        Self::pdf()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
