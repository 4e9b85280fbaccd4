//! Application configuration for RFP Intel.
//!
//! User config lives at `~/.rfpintel/rfpintel.toml`.
//! CLI flags override config file values, which override defaults.
//! Components never read this file themselves: callers build a
//! [`PipelineConfig`] and pass it (or one of its sections) into each call.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RfpIntelError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "rfpintel.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".rfpintel";

/// Obligation markers recognized when no override is configured.
pub const DEFAULT_OBLIGATION_MARKERS: &[&str] =
    &["shall", "must", "will", "is required to", "responsible for"];

// ---------------------------------------------------------------------------
// Config structs (matching rfpintel.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Text extraction limits.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Regulatory heading detection.
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Requirement extraction settings.
    #[serde(default)]
    pub requirements: RequirementsConfig,

    /// Capability coverage scoring settings.
    #[serde(default)]
    pub coverage: CoverageConfig,

    /// Continuity window settings.
    #[serde(default)]
    pub continuity: ContinuityConfig,

    /// Batch execution settings.
    #[serde(default)]
    pub batch: BatchConfig,
}

/// `[extraction]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Stop PDF extraction after this many pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,

    /// Truncate extracted text to this many characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chars: Option<usize>,
}

/// `[requirements]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementsConfig {
    /// Maximum requirements returned per extraction call.
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Obligation markers, matched case-insensitively on word boundaries.
    #[serde(default = "default_markers")]
    pub markers: Vec<String>,
}

impl Default for RequirementsConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            markers: default_markers(),
        }
    }
}

fn default_max_items() -> usize {
    200
}
fn default_markers() -> Vec<String> {
    DEFAULT_OBLIGATION_MARKERS
        .iter()
        .map(|m| (*m).to_string())
        .collect()
}

/// `[coverage]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Tokens shorter than this are ignored when scoring.
    #[serde(default = "default_min_token_len")]
    pub min_token_len: usize,

    /// Number of salient terms used to label a capability area.
    #[serde(default = "default_area_terms")]
    pub area_terms: usize,

    /// Additional stopwords on top of the built-in list.
    #[serde(default)]
    pub extra_stopwords: Vec<String>,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            min_token_len: default_min_token_len(),
            area_terms: default_area_terms(),
            extra_stopwords: Vec::new(),
        }
    }
}

fn default_min_token_len() -> usize {
    4
}
fn default_area_terms() -> usize {
    3
}

/// `[segmentation]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Only all-caps lettered titles (`L. INSTRUCTIONS`) open a section, so
    /// lettered list items such as `A. Technical volume` stay in place.
    #[serde(default)]
    pub strict_headings: bool,
}

/// `[continuity]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinuityConfig {
    /// Character budget for the assembled window (unbounded when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chars: Option<usize>,
}

/// `[batch]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Documents analyzed concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> u32 {
    4
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration, merged from config file + CLI flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    pub extraction: ExtractionConfig,
    pub segmentation: SegmentationConfig,
    pub requirements: RequirementsConfig,
    pub coverage: CoverageConfig,
    pub continuity: ContinuityConfig,
    pub batch: BatchConfig,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            extraction: config.extraction.clone(),
            segmentation: config.segmentation.clone(),
            requirements: config.requirements.clone(),
            coverage: config.coverage.clone(),
            continuity: config.continuity.clone(),
            batch: config.batch.clone(),
        }
    }
}

impl PipelineConfig {
    /// Reject settings that would make a component meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.requirements.max_items == 0 {
            return Err(RfpIntelError::config("requirements.max_items must be at least 1"));
        }
        if self
            .requirements
            .markers
            .iter()
            .all(|m| m.trim().is_empty())
        {
            return Err(RfpIntelError::config(
                "requirements.markers must contain at least one marker",
            ));
        }
        if self.coverage.min_token_len == 0 {
            return Err(RfpIntelError::config("coverage.min_token_len must be at least 1"));
        }
        if self.coverage.area_terms == 0 {
            return Err(RfpIntelError::config("coverage.area_terms must be at least 1"));
        }
        if self.batch.concurrency == 0 {
            return Err(RfpIntelError::config("batch.concurrency must be at least 1"));
        }
        if self.extraction.max_pages == Some(0) {
            return Err(RfpIntelError::config("extraction.max_pages must be at least 1"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.rfpintel/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RfpIntelError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.rfpintel/rfpintel.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RfpIntelError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        RfpIntelError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RfpIntelError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RfpIntelError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RfpIntelError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
