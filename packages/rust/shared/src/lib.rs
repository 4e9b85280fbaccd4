//! Shared types, error model, and configuration for RFP Intel.
//!
//! This crate is the foundation depended on by all other RFP Intel crates.
//! It provides:
//! - [`RfpIntelError`]: the unified error type
//! - Domain types ([`RawDocument`], [`SectionMap`], [`Requirement`], [`CapabilityRow`], ...)
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BatchConfig, ContinuityConfig, CoverageConfig, ExtractionConfig, PipelineConfig,
    RequirementsConfig, SegmentationConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, RfpIntelError};
pub use types::{
    AnalysisId, CapabilityRow, ComplianceMatrix, ComplianceStatus, DocumentKind, ExtractedText,
    HistoricalDocument, NumberedRequirement, RawDocument, Requirement, RequirementId,
    SECTION_KEYS, SectionDraft, SectionKey, SectionMap, Task,
};
