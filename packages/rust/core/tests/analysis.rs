//! End-to-end checks over the public API of `rfpintel-core`.

use pretty_assertions::assert_eq;

use rfpintel_core::{
    SilentProgress, analyze_batch, analyze_document, continuity_window, coverage_matrix,
    normalize_ids,
};
use rfpintel_shared::{
    ContinuityConfig, CoverageConfig, HistoricalDocument, PipelineConfig, RawDocument,
    SectionDraft, SectionKey,
};

const SOLICITATION: &str = "\
DEPARTMENT OF THE NAVY\r\n\
Request for Proposal N00024-26-R-0001\r\n\
\r\n\
SECTION C - DESCRIPTION / SPECIFICATIONS / STATEMENT OF WORK\r\n\
3.1 Help Desk: The contractor shall operate a tier 1 help desk.\r\n\
3.2 Transition The contractor must deliver a transition plan within\r\n\
30 days of award (REQ-9).\r\n\
\r\n\
SECTION L - INSTRUCTIONS, CONDITIONS, AND NOTICES TO OFFERORS\r\n\
Offerors shall submit the following volumes:\r\n\
1. Technical Approach\r\n\
2. Past Performance\r\n\
\r\n\
SECTION M - EVALUATION FACTORS FOR AWARD\r\n\
Technical approach will be rated more important than price.\r\n";

fn solicitation() -> RawDocument {
    RawDocument::new("n00024.txt", None, SOLICITATION.as_bytes().to_vec())
}

#[test]
fn full_analysis_of_a_text_solicitation() {
    let analysis = analyze_document(&solicitation(), &PipelineConfig::default()).unwrap();

    assert_eq!(analysis.extraction.method.as_deref(), Some("utf8"));
    assert!(!analysis.extraction.text.contains('\r'));

    assert!(analysis.sections.get(SectionKey::C).starts_with("SECTION C"));
    assert!(analysis.sections.get(SectionKey::L).contains("Offerors shall submit"));
    assert!(analysis.sections.get(SectionKey::M).contains("more important"));
    assert!(!analysis.sections.get(SectionKey::C).contains("NAVY"));

    let titles: Vec<&str> = analysis.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Help Desk", "Transition"]);
    assert!(analysis.tasks[1]
        .requirements
        .as_deref()
        .unwrap()
        .contains("must deliver a transition plan within 30 days"));

    let numbers: Vec<&str> = analysis
        .numbered_requirements
        .iter()
        .map(|n| n.number.as_str())
        .collect();
    assert_eq!(numbers, vec!["1", "2"]);

    let matrix = &analysis.compliance_matrix;
    assert_eq!(matrix.section_c.len(), 2);
    assert_eq!(matrix.section_l.len(), 1);
    assert_eq!(matrix.section_m.len(), 1);
    assert_eq!(matrix.section_c[1].id.as_ref().unwrap().as_str(), "REQ-009");
    assert!(matrix
        .section_l
        .iter()
        .chain(&matrix.section_m)
        .chain(&matrix.section_c)
        .all(|r| r.id.is_some()));
}

#[test]
fn analysis_serializes_to_json() {
    let analysis = analyze_document(&solicitation(), &PipelineConfig::default()).unwrap();
    let json = serde_json::to_value(&analysis).unwrap();

    assert_eq!(json["name"], "n00024.txt");
    assert_eq!(json["sections"]["A"], "");
    assert_eq!(json["compliance_matrix"]["section_m"][0]["source_section"], "M");
    assert_eq!(
        json["compliance_matrix"]["section_m"][0]["compliance_status"],
        "not_addressed"
    );
}

#[test]
fn coverage_against_past_performance() {
    let analysis = analyze_document(&solicitation(), &PipelineConfig::default()).unwrap();
    let history = vec![
        HistoricalDocument::new(
            "fleet-helpdesk.txt",
            "Operated a tier 1 help desk for fleet users; resolved 95% of tickets.",
        ),
        HistoricalDocument::new(
            "base-transition.txt",
            "Delivered a transition plan and completed transition within 30 days.",
        ),
    ];

    let rows = coverage_matrix(&analysis.requirements, &history, &CoverageConfig::default())
        .unwrap();

    assert_eq!(rows.len(), analysis.requirements.len());
    assert_eq!(rows[0].requirement_id.as_str(), "REQ-001");
    assert_eq!(rows[0].best_match_document.as_deref(), Some("fleet-helpdesk.txt"));
    assert_eq!(rows[1].best_match_document.as_deref(), Some("base-transition.txt"));
    assert!(rows.iter().all(|r| (0.0..=1.0).contains(&r.coverage_score)));
}

#[test]
fn ids_and_continuity_work_standalone() {
    let ids = normalize_ids("REQ-7 and reqid 22 must both be addressed.", 3);
    let ids: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
    assert_eq!(ids, vec!["REQ-007", "REQ-022"]);

    let drafts = vec![
        SectionDraft::new(1, "Intro", "body1"),
        SectionDraft::new(2, "Approach", "body2"),
        SectionDraft::new(3, "Staffing", ""),
    ];
    let window = continuity_window(&drafts, 3, &ContinuityConfig::default()).unwrap();
    assert!(window.contains("Section 1: Intro"));
    assert!(window.contains("Section 2: Approach"));
    assert!(!window.contains("Section 3"));
}

#[tokio::test]
async fn batch_mixes_text_pdf_and_unsupported() {
    let docs = vec![
        solicitation(),
        RawDocument::new("scan.pdf", Some("application/pdf"), b"%PDF-1.4 truncated".to_vec()),
        RawDocument::new("pricing.xlsx", None, b"PK\x03\x04".to_vec()),
    ];
    let report = analyze_batch(docs, &PipelineConfig::default(), &SilentProgress)
        .await
        .unwrap();

    // Extraction problems are data, not batch failures.
    assert!(report.failures.is_empty());
    assert_eq!(report.documents.len(), 3);
    assert!(report.documents[0].extraction.error.is_none());
    assert!(report.documents[1].extraction.error.is_some());
    assert_eq!(
        report.documents[2].extraction.error.as_deref(),
        Some("unsupported document type: xlsx")
    );
    assert!(report.documents[2].requirements.is_empty());
}
