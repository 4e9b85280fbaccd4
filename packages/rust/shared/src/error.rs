//! Error types for RFP Intel.
//!
//! Library crates use [`RfpIntelError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all RFP Intel operations.
#[derive(Debug, thiserror::Error)]
pub enum RfpIntelError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A text extractor failed on a document.
    ///
    /// Only seen inside the extractor chain; the normalizer folds it into
    /// `ExtractedText::error` before returning to callers.
    #[error("extraction error ({extractor}): {message}")]
    Extraction { extractor: String, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed caller input, rejected before any processing.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A blocking worker task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RfpIntelError>;

impl RfpIntelError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an extraction error attributed to a named extractor.
    pub fn extraction(extractor: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Extraction {
            extractor: extractor.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
