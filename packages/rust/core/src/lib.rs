//! Core analysis logic for RFP Intel.
//!
//! Each module is a pure transform over explicit inputs: segmentation,
//! requirement extraction, id normalization, compliance matrices, capability
//! coverage and continuity windows. [`pipeline`] ties them into per-document
//! and batch analysis.

pub mod continuity;
pub mod coverage;
pub mod ids;
pub mod matrix;
pub mod pipeline;
pub mod requirements;
pub mod segmenter;

pub use continuity::continuity_window;
pub use coverage::CoverageScorer;
pub use ids::{IdAllocator, assign_ids, explicit_ids, normalize_ids};
pub use matrix::{build_matrix, link_ids};
pub use pipeline::{
    BatchFailure, BatchReport, DocumentAnalysis, ProgressReporter, SilentProgress,
    analyze_batch, analyze_document, coverage_matrix,
};
pub use requirements::{RequirementExtractor, extract_numbered};
pub use segmenter::{SectionSegmenter, segment_sections, segment_tasks};
