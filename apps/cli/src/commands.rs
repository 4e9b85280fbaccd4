//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use rfpintel_core::pipeline::{BatchReport, ProgressReporter};
use rfpintel_core::{
    CoverageScorer, RequirementExtractor, SectionSegmenter, analyze_batch, analyze_document,
    continuity_window, normalize_ids, segment_tasks,
};
use rfpintel_shared::{
    AppConfig, HistoricalDocument, PipelineConfig, RawDocument, SectionDraft, init_config,
    load_config, load_config_from,
};
use rfpintel_text::TextNormalizer;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// RFP Intel: pull sections, requirements and compliance data out of solicitations.
#[derive(Parser)]
#[command(
    name = "rfpintel",
    version,
    about = "Extract sections, requirements and compliance matrices from RFP documents.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.rfpintel/rfpintel.toml.
    #[arg(long, global = true, env = "RFPINTEL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full analysis over one or more documents.
    Analyze {
        /// Documents to analyze (PDF or plain text).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Documents analyzed at once (overrides config).
        #[arg(short, long)]
        concurrency: Option<u32>,

        /// Stop PDF extraction after this many pages (overrides config).
        #[arg(long)]
        max_pages: Option<u32>,

        /// Truncate extracted text to this many characters (overrides config).
        #[arg(long)]
        max_chars: Option<usize>,
    },

    /// Print the lettered regulatory sections of a document.
    Sections {
        file: PathBuf,
    },

    /// Print numbered tasks and their obligation sentences.
    Tasks {
        file: PathBuf,
    },

    /// Print the Section L / M / C compliance matrix.
    Matrix {
        file: PathBuf,

        /// Maximum requirements per section (overrides config).
        #[arg(long)]
        max_items: Option<usize>,
    },

    /// Normalize requirement ids found in a piece of text.
    Ids {
        text: String,

        /// Number used when the text names no id.
        #[arg(long, default_value_t = 1)]
        fallback: u64,
    },

    /// Score an RFP's requirements against past-performance documents.
    Coverage {
        /// The RFP to take requirements from.
        rfp: PathBuf,

        /// Historical documents to score against.
        #[arg(long, num_args = 1.., required = true)]
        history: Vec<PathBuf>,
    },

    /// Build the prior-section context for drafting a proposal section.
    Continuity {
        /// JSON file holding an array of `{index, title, draft}` objects.
        #[arg(long)]
        drafts: PathBuf,

        /// Index of the section about to be drafted.
        #[arg(long)]
        current: u32,

        /// Character budget for the window (overrides config).
        #[arg(long)]
        max_chars: Option<usize>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries results.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "rfpintel=info",
        1 => "rfpintel=debug",
        _ => "rfpintel=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Analyze {
            files,
            concurrency,
            max_pages,
            max_chars,
        } => {
            let mut config = pipeline_config(config_path)?;
            if let Some(n) = concurrency {
                config.batch.concurrency = n;
            }
            if max_pages.is_some() {
                config.extraction.max_pages = max_pages;
            }
            if max_chars.is_some() {
                config.extraction.max_chars = max_chars;
            }
            cmd_analyze(&files, &config).await
        }
        Command::Sections { file } => cmd_sections(&file, &pipeline_config(config_path)?),
        Command::Tasks { file } => cmd_tasks(&file, &pipeline_config(config_path)?),
        Command::Matrix { file, max_items } => {
            let mut config = pipeline_config(config_path)?;
            if let Some(n) = max_items {
                config.requirements.max_items = n;
            }
            cmd_matrix(&file, &config)
        }
        Command::Ids { text, fallback } => cmd_ids(&text, fallback),
        Command::Coverage { rfp, history } => {
            cmd_coverage(&rfp, &history, &pipeline_config(config_path)?).await
        }
        Command::Continuity {
            drafts,
            current,
            max_chars,
        } => {
            let mut config = pipeline_config(config_path)?;
            if max_chars.is_some() {
                config.continuity.max_chars = max_chars;
            }
            cmd_continuity(&drafts, current, &config)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn app_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

fn pipeline_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = PipelineConfig::from(&app_config(path)?);
    config.validate()?;
    Ok(config)
}

/// Read a file into a document; the media type is left to content sniffing.
fn read_document(path: &Path) -> Result<RawDocument> {
    let content =
        std::fs::read(path).map_err(|e| eyre!("cannot read '{}': {e}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Ok(RawDocument::new(name, None, content))
}

/// Read and normalize a document, failing if no text could be extracted.
fn read_text(path: &Path, config: &PipelineConfig) -> Result<(RawDocument, String)> {
    let doc = read_document(path)?;
    let extracted = TextNormalizer::new(config.extraction.clone()).normalize(&doc);
    if let Some(error) = extracted.error {
        return Err(eyre!("{}: {error}", path.display()));
    }
    Ok((doc, extracted.text))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_analyze(files: &[PathBuf], config: &PipelineConfig) -> Result<()> {
    let documents = files
        .iter()
        .map(|p| read_document(p))
        .collect::<Result<Vec<_>>>()?;

    info!(documents = documents.len(), "analyzing documents");

    let reporter = CliProgress::new();
    let report = analyze_batch(documents, config, &reporter).await?;

    for failure in &report.failures {
        warn!(name = %failure.name, error = %failure.error, "document not analyzed");
    }

    print_json(&report)
}

fn cmd_sections(file: &Path, config: &PipelineConfig) -> Result<()> {
    let (_, text) = read_text(file, config)?;
    let sections = SectionSegmenter::from_config(&config.segmentation).segment(&text);
    print_json(&sections)
}

fn cmd_tasks(file: &Path, config: &PipelineConfig) -> Result<()> {
    let (_, text) = read_text(file, config)?;
    let extractor = RequirementExtractor::new(&config.requirements)?;
    print_json(&segment_tasks(&text, &extractor))
}

fn cmd_matrix(file: &Path, config: &PipelineConfig) -> Result<()> {
    let doc = read_document(file)?;
    let analysis = analyze_document(&doc, config)?;
    if let Some(error) = &analysis.extraction.error {
        return Err(eyre!("{}: {error}", file.display()));
    }
    print_json(&analysis.compliance_matrix)
}

fn cmd_ids(text: &str, fallback: u64) -> Result<()> {
    print_json(&normalize_ids(text, fallback))
}

async fn cmd_coverage(rfp: &Path, history: &[PathBuf], config: &PipelineConfig) -> Result<()> {
    let doc = read_document(rfp)?;
    let analysis = analyze_document(&doc, config)?;
    if let Some(error) = &analysis.extraction.error {
        return Err(eyre!("{}: {error}", rfp.display()));
    }

    let mut documents = Vec::with_capacity(history.len());
    for path in history {
        let (raw, text) = read_text(path, config)?;
        documents.push(HistoricalDocument::new(raw.name, text));
    }

    info!(
        requirements = analysis.requirements.len(),
        history = documents.len(),
        "scoring capability coverage"
    );

    let texts: Vec<String> = analysis.requirements.iter().map(|r| r.text.clone()).collect();
    let rows = CoverageScorer::new(&config.coverage)
        .score_concurrent(texts, &documents, config.batch.concurrency as usize)
        .await?;

    print_json(&rows)
}

fn cmd_continuity(drafts: &Path, current: u32, config: &PipelineConfig) -> Result<()> {
    let raw = std::fs::read_to_string(drafts)
        .map_err(|e| eyre!("cannot read '{}': {e}", drafts.display()))?;
    let drafts: Vec<SectionDraft> = serde_json::from_str(&raw)
        .map_err(|e| eyre!("invalid drafts file '{}': {e}", drafts.display()))?;

    let window = continuity_window(&drafts, current, &config.continuity)?;
    println!("{window}");
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = app_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        bar.set_style(style);
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn started(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_message("Analyzing");
    }

    fn document_done(&self, name: &str, _current: usize, _total: usize) {
        self.bar.inc(1);
        self.bar.set_message(format!("Analyzed {name}"));
    }

    fn document_failed(&self, name: &str, _error: &str) {
        self.bar.inc(1);
        self.bar.set_message(format!("Failed {name}"));
    }

    fn done(&self, _report: &BatchReport) {
        self.bar.finish_and_clear();
    }
}
