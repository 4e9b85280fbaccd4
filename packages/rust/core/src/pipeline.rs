//! End-to-end document analysis: bytes → text → sections → requirements → matrix.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use rfpintel_shared::{
    AnalysisId, CapabilityRow, ComplianceMatrix, CoverageConfig, ExtractedText,
    HistoricalDocument, NumberedRequirement, PipelineConfig, RawDocument, Requirement, Result,
    RfpIntelError, SectionMap, Task,
};
use rfpintel_text::TextNormalizer;

use crate::coverage::CoverageScorer;
use crate::ids::IdAllocator;
use crate::matrix::{build_matrix, link_ids};
use crate::requirements::{RequirementExtractor, extract_numbered};
use crate::segmenter::{SectionSegmenter, segment_tasks};

/// Everything the pipeline learned about one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub name: String,
    /// SHA-256 of the raw bytes, lowercase hex.
    pub content_hash: String,
    pub extraction: ExtractedText,
    pub sections: SectionMap,
    pub tasks: Vec<Task>,
    /// Requirements from every populated section (or the whole text when no
    /// section heading was found), with ids assigned.
    pub requirements: Vec<Requirement>,
    pub numbered_requirements: Vec<NumberedRequirement>,
    pub compliance_matrix: ComplianceMatrix,
    pub analyzed_at: DateTime<Utc>,
}

/// A document in a batch that could not be analyzed at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub name: String,
    pub error: String,
}

/// Result of [`analyze_batch`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub id: AnalysisId,
    /// Successful analyses, in input order.
    pub documents: Vec<DocumentAnalysis>,
    pub failures: Vec<BatchFailure>,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

/// Progress callback for reporting batch status.
pub trait ProgressReporter: Send + Sync {
    /// Called once before any document is processed.
    fn started(&self, total: usize);
    /// Called as each document's result is collected, in input order.
    fn document_done(&self, name: &str, current: usize, total: usize);
    /// Called when a document fails.
    fn document_failed(&self, name: &str, error: &str);
    /// Called when the batch completes.
    fn done(&self, report: &BatchReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn started(&self, _total: usize) {}
    fn document_done(&self, _name: &str, _current: usize, _total: usize) {}
    fn document_failed(&self, _name: &str, _error: &str) {}
    fn done(&self, _report: &BatchReport) {}
}

// ---------------------------------------------------------------------------
// Single document
// ---------------------------------------------------------------------------

/// Analyze one document.
///
/// 1. Validate the document and config
/// 2. Normalize bytes to text (failure is recorded, not raised)
/// 3. Segment regulatory sections and numbered tasks
/// 4. Extract requirements per populated section, or from the whole text
///    when no section was found
/// 5. Assign requirement ids
/// 6. Extract the numbered list
/// 7. Build the compliance matrix and link ids into it
#[instrument(skip_all, fields(name = %doc.name, bytes = doc.content.len()))]
pub fn analyze_document(doc: &RawDocument, config: &PipelineConfig) -> Result<DocumentAnalysis> {
    doc.validate()?;
    config.validate()?;

    let extractor = RequirementExtractor::new(&config.requirements)?;

    // --- Phase 1: Text ---
    let extraction = TextNormalizer::new(config.extraction.clone()).normalize(doc);
    if let Some(error) = &extraction.error {
        warn!(%error, "text extraction failed, downstream results will be empty");
    }
    let text = extraction.text.as_str();

    // --- Phase 2: Segmentation ---
    let sections = SectionSegmenter::from_config(&config.segmentation).segment(text);
    let tasks = segment_tasks(text, &extractor);

    // --- Phase 3: Requirements ---
    let mut requirements: Vec<Requirement> = if sections.is_all_empty() {
        extractor.extract(text, None)
    } else {
        sections
            .populated()
            .flat_map(|(key, body)| extractor.extract(body, Some(key)))
            .collect()
    };
    IdAllocator::new().assign(&mut requirements);

    let numbered_requirements = extract_numbered(text);

    // --- Phase 4: Compliance matrix ---
    let mut compliance_matrix = build_matrix(&sections, &extractor);
    link_ids(&mut compliance_matrix, &requirements);

    info!(
        sections = sections.populated().count(),
        tasks = tasks.len(),
        requirements = requirements.len(),
        numbered = numbered_requirements.len(),
        matrix = compliance_matrix.total(),
        "document analyzed"
    );

    Ok(DocumentAnalysis {
        name: doc.name.clone(),
        content_hash: content_hash(&doc.content),
        extraction,
        sections,
        tasks,
        requirements,
        numbered_requirements,
        compliance_matrix,
        analyzed_at: Utc::now(),
    })
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Analyze documents concurrently, at most `batch.concurrency` at a time.
///
/// Each document runs on a blocking worker. A document that fails validation
/// or whose worker dies is recorded in `failures`; the rest of the batch
/// continues. Successful analyses keep input order.
#[instrument(skip_all, fields(documents = documents.len()))]
pub async fn analyze_batch(
    documents: Vec<RawDocument>,
    config: &PipelineConfig,
    progress: &dyn ProgressReporter,
) -> Result<BatchReport> {
    config.validate()?;

    let start = Instant::now();
    let id = AnalysisId::new();
    let total = documents.len();

    info!(%id, total, concurrency = config.batch.concurrency, "starting batch analysis");
    progress.started(total);

    let semaphore = Arc::new(Semaphore::new(config.batch.concurrency as usize));
    let mut handles = Vec::with_capacity(total);

    for doc in documents {
        let name = doc.name.clone();
        let sem = Arc::clone(&semaphore);
        let config = config.clone();

        let handle = tokio::spawn(async move {
            let _permit = sem
                .acquire_owned()
                .await
                .map_err(|e| RfpIntelError::Task(format!("semaphore closed: {e}")))?;

            tokio::task::spawn_blocking(move || analyze_document(&doc, &config))
                .await
                .map_err(|e| RfpIntelError::Task(format!("analysis worker: {e}")))?
        });
        handles.push((name, handle));
    }

    let mut analyses = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (i, (name, handle)) in handles.into_iter().enumerate() {
        let outcome = handle
            .await
            .map_err(|e| RfpIntelError::Task(e.to_string()))
            .and_then(|result| result);

        match outcome {
            Ok(analysis) => {
                progress.document_done(&name, i + 1, total);
                analyses.push(analysis);
            }
            Err(e) => {
                warn!(name = %name, error = %e, "document analysis failed");
                progress.document_failed(&name, &e.to_string());
                failures.push(BatchFailure {
                    name,
                    error: e.to_string(),
                });
            }
        }
    }

    let report = BatchReport {
        id,
        documents: analyses,
        failures,
        elapsed: start.elapsed(),
    };

    progress.done(&report);

    info!(
        id = %report.id,
        analyzed = report.documents.len(),
        failed = report.failures.len(),
        elapsed_ms = report.elapsed.as_millis(),
        "batch analysis complete"
    );

    Ok(report)
}

// ---------------------------------------------------------------------------
// Coverage
// ---------------------------------------------------------------------------

/// Score requirements against historical documents, one row per requirement.
pub fn coverage_matrix(
    requirements: &[Requirement],
    history: &[HistoricalDocument],
    config: &CoverageConfig,
) -> Result<Vec<CapabilityRow>> {
    let texts: Vec<String> = requirements.iter().map(|r| r.text.clone()).collect();
    CoverageScorer::new(config).score(&texts, history)
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rfpintel_shared::{ComplianceStatus, SectionKey};
    use std::sync::Mutex;

    const RFP: &str = "\
SECTION C - STATEMENT OF WORK
3.1 Transition: The contractor shall provide a transition plan (REQ-12).
3.2 Staffing The contractor must maintain qualified personnel.

SECTION L - INSTRUCTIONS
Offerors shall submit the following:
1. Technical volume
2. Price volume

SECTION M - EVALUATION
Proposals will be evaluated on technical merit.
";

    fn text_doc(name: &str, body: &str) -> RawDocument {
        RawDocument::new(name, Some("text/plain"), body.as_bytes().to_vec())
    }

    #[test]
    fn analyzes_a_plain_text_rfp() {
        let analysis = analyze_document(&text_doc("rfp.txt", RFP), &PipelineConfig::default())
            .unwrap();

        assert_eq!(analysis.extraction.error, None);
        assert_eq!(analysis.sections.populated().count(), 3);
        assert_eq!(analysis.tasks.len(), 2);
        assert_eq!(analysis.numbered_requirements.len(), 2);
        assert_eq!(analysis.compliance_matrix.section_c.len(), 2);
        assert_eq!(analysis.compliance_matrix.section_l.len(), 1);
        assert_eq!(analysis.compliance_matrix.section_m.len(), 1);
        assert_eq!(analysis.content_hash.len(), 64);

        let ids: Vec<&str> = analysis
            .requirements
            .iter()
            .map(|r| r.id.as_ref().unwrap().as_str())
            .collect();
        assert_eq!(ids, vec!["REQ-012", "REQ-002", "REQ-003", "REQ-004"]);

        // Matrix entries carry the same ids.
        assert_eq!(
            analysis.compliance_matrix.section_c[0].id.as_ref().unwrap().as_str(),
            "REQ-012"
        );
        assert!(analysis
            .requirements
            .iter()
            .all(|r| r.compliance_status == ComplianceStatus::NotAddressed));
    }

    #[test]
    fn falls_back_to_whole_text_without_sections() {
        let doc = text_doc("memo.txt", "The vendor shall deliver. Nothing else.");
        let analysis = analyze_document(&doc, &PipelineConfig::default()).unwrap();

        assert!(analysis.sections.is_all_empty());
        assert_eq!(analysis.requirements.len(), 1);
        assert_eq!(analysis.requirements[0].source_section, None);
        assert_eq!(analysis.compliance_matrix.total(), 0);
    }

    #[test]
    fn extraction_failure_gives_empty_analysis() {
        let doc = RawDocument::new("broken.pdf", None, b"%PDF-1.7 not really".to_vec());
        let analysis = analyze_document(&doc, &PipelineConfig::default()).unwrap();

        assert!(analysis.extraction.error.is_some());
        assert!(analysis.sections.is_all_empty());
        assert!(analysis.requirements.is_empty());
        assert!(analysis.tasks.is_empty());
    }

    #[test]
    fn invalid_input_is_rejected() {
        let err = analyze_document(&text_doc("", "x"), &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, RfpIntelError::Validation { .. }));

        let mut config = PipelineConfig::default();
        config.batch.concurrency = 0;
        let err = analyze_document(&text_doc("a.txt", "x"), &config).unwrap_err();
        assert!(matches!(err, RfpIntelError::Config { .. }));
    }

    #[test]
    fn requirement_cap_applies_per_section() {
        let mut config = PipelineConfig::default();
        config.requirements.max_items = 1;
        let analysis = analyze_document(&text_doc("rfp.txt", RFP), &config).unwrap();

        assert_eq!(analysis.compliance_matrix.section_c.len(), 1);
        assert_eq!(analysis.requirements.len(), 3);
        assert_eq!(analysis.requirements[0].source_section, Some(SectionKey::C));
    }

    #[test]
    fn coverage_matrix_is_one_row_per_requirement() {
        let analysis = analyze_document(&text_doc("rfp.txt", RFP), &PipelineConfig::default())
            .unwrap();
        let rows =
            coverage_matrix(&analysis.requirements, &[], &CoverageConfig::default()).unwrap();
        assert_eq!(rows.len(), analysis.requirements.len());
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn started(&self, total: usize) {
            self.events.lock().unwrap().push(format!("start {total}"));
        }
        fn document_done(&self, name: &str, _current: usize, _total: usize) {
            self.events.lock().unwrap().push(format!("done {name}"));
        }
        fn document_failed(&self, name: &str, _error: &str) {
            self.events.lock().unwrap().push(format!("fail {name}"));
        }
        fn done(&self, _report: &BatchReport) {
            self.events.lock().unwrap().push("finish".into());
        }
    }

    #[tokio::test]
    async fn batch_preserves_order_and_records_failures() {
        let docs = vec![
            text_doc("a.txt", RFP),
            text_doc(" ", "bad name"),
            text_doc("c.txt", "SECTION L\nOfferors must comply."),
        ];
        let progress = RecordingProgress::default();
        let report = analyze_batch(docs, &PipelineConfig::default(), &progress)
            .await
            .unwrap();

        let names: Vec<&str> = report.documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "c.txt"]);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].error.contains("validation"));

        let events = progress.events.lock().unwrap().clone();
        assert_eq!(events.first().map(String::as_str), Some("start 3"));
        assert_eq!(events.last().map(String::as_str), Some("finish"));
        assert!(events.contains(&"fail  ".to_string()));
    }

    #[tokio::test]
    async fn progress_reports_in_input_order() {
        let slow = RFP.repeat(200);
        let docs = vec![
            text_doc("big.txt", &slow),
            text_doc("b.txt", "The vendor shall deliver."),
            text_doc("c.txt", "The vendor must report."),
        ];
        let mut config = PipelineConfig::default();
        config.batch.concurrency = 3;
        let progress = RecordingProgress::default();
        analyze_batch(docs, &config, &progress).await.unwrap();

        let events = progress.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["start 3", "done big.txt", "done b.txt", "done c.txt", "finish"]
        );
    }

    #[test]
    fn strict_headings_keep_list_items_in_section_l() {
        let text = "SECTION L - INSTRUCTIONS\nOfferors shall submit:\nA. Technical volume\nB. Price volume";
        let mut config = PipelineConfig::default();
        config.segmentation.strict_headings = true;
        let analysis = analyze_document(&text_doc("rfp.txt", text), &config).unwrap();

        assert!(analysis.sections.get(SectionKey::L).ends_with("B. Price volume"));
        assert_eq!(analysis.sections.get(SectionKey::new('A').unwrap()), "");
    }

    #[tokio::test]
    async fn empty_batch_completes() {
        let report = analyze_batch(Vec::new(), &PipelineConfig::default(), &SilentProgress)
            .await
            .unwrap();
        assert!(report.documents.is_empty());
        assert!(report.failures.is_empty());
    }

    #[test]
    fn batch_report_serializes_elapsed_as_millis() {
        let report = BatchReport {
            id: AnalysisId::new(),
            documents: Vec::new(),
            failures: Vec::new(),
            elapsed: Duration::from_millis(1500),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["elapsed"], 1500);
    }
}
