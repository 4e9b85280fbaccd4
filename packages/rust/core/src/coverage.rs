//! Capability coverage: how well historical material covers each requirement.
//!
//! Scoring is plain token-set overlap. Each requirement's significant tokens
//! are compared against every historical document; the document sharing the
//! largest fraction wins, first document on ties.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, instrument};

use rfpintel_shared::{
    CapabilityRow, CoverageConfig, HistoricalDocument, RequirementId, Result, RfpIntelError,
};

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Common words carrying no capability signal.
const STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "also", "among", "been", "before", "being",
    "below", "between", "both", "could", "does", "doing", "during", "each", "either", "every",
    "from", "further", "have", "having", "here", "into", "itself", "least", "more", "most",
    "must", "neither", "only", "other", "over", "same", "shall", "should", "some", "such",
    "than", "that", "their", "them", "then", "there", "these", "they", "this", "those",
    "through", "under", "until", "upon", "very", "were", "what", "when", "where", "which",
    "while", "will", "with", "within", "without", "would", "your",
];

/// Procurement boilerplate that appears in nearly every requirement and says
/// nothing about the capability area.
const GENERIC_TERMS: &[&str] = &[
    "contractor", "contractors", "offeror", "offerors", "government", "provide", "provides",
    "providing", "required", "requirement", "requirements", "responsible", "ensure", "perform",
];

const GENERAL_AREA: &str = "General";

/// Lowercase alphanumeric runs, in order.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// A historical document reduced to its significant token set.
#[derive(Debug)]
struct IndexedDocument {
    name: String,
    tokens: HashSet<String>,
}

/// Scores requirement texts against historical documents.
#[derive(Debug, Clone)]
pub struct CoverageScorer {
    min_token_len: usize,
    area_terms: usize,
    stopwords: HashSet<String>,
}

impl CoverageScorer {
    pub fn new(config: &CoverageConfig) -> Self {
        let stopwords = STOPWORDS
            .iter()
            .map(|s| (*s).to_string())
            .chain(config.extra_stopwords.iter().map(|s| s.trim().to_lowercase()))
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            min_token_len: config.min_token_len.max(1),
            area_terms: config.area_terms.max(1),
            stopwords,
        }
    }

    fn is_significant(&self, token: &str) -> bool {
        token.chars().count() >= self.min_token_len && !self.stopwords.contains(token)
    }

    fn significant_tokens<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        tokens(text).filter(|t| self.is_significant(t))
    }

    fn index(&self, documents: &[HistoricalDocument]) -> Result<Vec<IndexedDocument>> {
        documents
            .iter()
            .map(|doc| {
                doc.validate()?;
                Ok(IndexedDocument {
                    name: doc.name.clone(),
                    tokens: self.significant_tokens(&doc.text).collect(),
                })
            })
            .collect()
    }

    /// Score every requirement; one row per requirement, input order kept.
    ///
    /// Row ids are positional (`REQ-001`, `REQ-002`, ...) regardless of any
    /// id embedded in the text.
    #[instrument(skip_all, fields(requirements = requirements.len(), documents = documents.len()))]
    pub fn score(
        &self,
        requirements: &[String],
        documents: &[HistoricalDocument],
    ) -> Result<Vec<CapabilityRow>> {
        let indexed = self.index(documents)?;
        let rows: Vec<CapabilityRow> = requirements
            .iter()
            .enumerate()
            .map(|(i, text)| self.score_one(i, text, &indexed))
            .collect();

        debug!(
            matched = rows.iter().filter(|r| r.best_match_document.is_some()).count(),
            "coverage scored"
        );
        Ok(rows)
    }

    /// Like [`score`](Self::score), but fans chunks of requirements out to
    /// blocking tasks. Rows come back in input order.
    #[instrument(skip_all, fields(requirements = requirements.len(), documents = documents.len()))]
    pub async fn score_concurrent(
        &self,
        requirements: Vec<String>,
        documents: &[HistoricalDocument],
        concurrency: usize,
    ) -> Result<Vec<CapabilityRow>> {
        if requirements.is_empty() {
            return Ok(Vec::new());
        }

        let indexed = Arc::new(self.index(documents)?);
        let workers = concurrency.max(1);
        let chunk_size = requirements.len().div_ceil(workers);

        let mut handles = Vec::new();
        for (chunk_index, chunk) in requirements.chunks(chunk_size).enumerate() {
            let scorer = self.clone();
            let indexed = Arc::clone(&indexed);
            let chunk = chunk.to_vec();
            let offset = chunk_index * chunk_size;

            handles.push(tokio::task::spawn_blocking(move || {
                chunk
                    .iter()
                    .enumerate()
                    .map(|(i, text)| scorer.score_one(offset + i, text, &indexed))
                    .collect::<Vec<_>>()
            }));
        }

        let mut rows = Vec::with_capacity(requirements.len());
        for handle in handles {
            let chunk_rows = handle
                .await
                .map_err(|e| RfpIntelError::Task(format!("coverage worker: {e}")))?;
            rows.extend(chunk_rows);
        }

        Ok(rows)
    }

    fn score_one(&self, position: usize, text: &str, documents: &[IndexedDocument]) -> CapabilityRow {
        let wanted: HashSet<String> = self.significant_tokens(text).collect();

        let mut best: Option<(&IndexedDocument, usize)> = None;
        if !wanted.is_empty() {
            for doc in documents {
                let shared = wanted.intersection(&doc.tokens).count();
                if shared > 0 && best.is_none_or(|(_, top)| shared > top) {
                    best = Some((doc, shared));
                }
            }
        }

        let (best_match_document, coverage_score) = match best {
            Some((doc, shared)) => (Some(doc.name.clone()), shared as f64 / wanted.len() as f64),
            None => (None, 0.0),
        };

        CapabilityRow {
            requirement_id: RequirementId::from_number(position as u64 + 1),
            requirement_text: text.to_string(),
            best_match_document,
            coverage_score,
            capability_area: self.capability_area(text),
        }
    }

    /// Label a requirement with its most frequent salient terms.
    ///
    /// Frequency descending, first occurrence breaking ties; `"General"` when
    /// no salient term survives filtering.
    pub fn capability_area(&self, text: &str) -> String {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        for (position, token) in self
            .significant_tokens(text)
            .filter(|t| !GENERIC_TERMS.contains(&t.as_str()))
            .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
            .enumerate()
        {
            counts.entry(token).or_insert((0, position)).0 += 1;
        }

        let mut ranked: Vec<(String, usize, usize)> = counts
            .into_iter()
            .map(|(term, (count, first))| (term, count, first))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        let terms: Vec<String> = ranked
            .into_iter()
            .take(self.area_terms)
            .map(|(term, _, _)| title_case(&term))
            .collect();

        if terms.is_empty() {
            GENERAL_AREA.to_string()
        } else {
            terms.join(" / ")
        }
    }
}

impl Default for CoverageScorer {
    fn default() -> Self {
        Self::new(&CoverageConfig::default())
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn history() -> Vec<HistoricalDocument> {
        vec![
            HistoricalDocument::new(
                "navy-helpdesk.txt",
                "Delivered tiered help desk support and incident tracking for 4,000 users.",
            ),
            HistoricalDocument::new(
                "army-transition.txt",
                "Executed a ninety day transition plan with zero service interruption.",
            ),
        ]
    }

    fn reqs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn picks_best_matching_document() {
        let rows = CoverageScorer::default()
            .score(
                &reqs(&["The contractor shall provide a transition plan."]),
                &history(),
            )
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].requirement_id.as_str(), "REQ-001");
        assert_eq!(rows[0].best_match_document.as_deref(), Some("army-transition.txt"));
        // Significant tokens: contractor, provide, transition, plan.
        assert_eq!(rows[0].coverage_score, 0.5);
        assert_eq!(rows[0].capability_area, "Transition / Plan");
    }

    #[test]
    fn no_documents_scores_zero_everywhere() {
        let requirements = reqs(&[
            "The contractor shall staff a help desk.",
            "Offerors must submit pricing.",
            "It will be so.",
        ]);
        let rows = CoverageScorer::default().score(&requirements, &[]).unwrap();

        assert_eq!(rows.len(), requirements.len());
        for row in &rows {
            assert_eq!(row.coverage_score, 0.0);
            assert_eq!(row.best_match_document, None);
            assert!(!row.capability_area.is_empty());
        }
        assert_eq!(rows[2].capability_area, "General");
    }

    #[test]
    fn zero_overlap_has_no_best_match() {
        let rows = CoverageScorer::default()
            .score(&reqs(&["Quantum cryptography research must continue."]), &history())
            .unwrap();
        assert_eq!(rows[0].best_match_document, None);
        assert_eq!(rows[0].coverage_score, 0.0);
    }

    #[test]
    fn ties_go_to_first_document() {
        let docs = vec![
            HistoricalDocument::new("first", "network security"),
            HistoricalDocument::new("second", "network security"),
        ];
        let rows = CoverageScorer::default()
            .score(&reqs(&["Network security shall be maintained."]), &docs)
            .unwrap();
        assert_eq!(rows[0].best_match_document.as_deref(), Some("first"));
    }

    #[test]
    fn ids_are_positional_not_embedded() {
        let rows = CoverageScorer::default()
            .score(&reqs(&["REQ-042 shall apply.", "REQ-007 shall apply."]), &[])
            .unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.requirement_id.as_str()).collect();
        assert_eq!(ids, vec!["REQ-001", "REQ-002"]);
    }

    #[test]
    fn extra_stopwords_are_honored() {
        let config = CoverageConfig {
            extra_stopwords: vec!["Transition".into()],
            ..CoverageConfig::default()
        };
        let area = CoverageScorer::new(&config)
            .capability_area("The contractor shall provide a transition plan.");
        assert_eq!(area, "Plan");
    }

    #[test]
    fn area_ranks_by_frequency_then_position() {
        let area = CoverageScorer::default().capability_area(
            "Security audits, security training, and security reporting on network audits.",
        );
        assert_eq!(area, "Security / Audits / Training");
    }

    #[test]
    fn blank_document_name_is_rejected() {
        let docs = vec![HistoricalDocument::new(" ", "text")];
        let err = CoverageScorer::default()
            .score(&reqs(&["Anything shall do."]), &docs)
            .unwrap_err();
        assert!(matches!(err, RfpIntelError::Validation { .. }));
    }

    #[tokio::test]
    async fn concurrent_scoring_matches_sequential_order() {
        let requirements: Vec<String> = (0..23)
            .map(|i| {
                if i % 2 == 0 {
                    format!("Item {i}: the contractor shall run the help desk.")
                } else {
                    format!("Item {i}: the contractor shall execute the transition plan.")
                }
            })
            .collect();
        let scorer = CoverageScorer::default();

        let sequential = scorer.score(&requirements, &history()).unwrap();
        let concurrent = scorer
            .score_concurrent(requirements.clone(), &history(), 4)
            .await
            .unwrap();

        assert_eq!(concurrent, sequential);
    }

    #[tokio::test]
    async fn concurrent_scoring_handles_empty_input() {
        let rows = CoverageScorer::default()
            .score_concurrent(Vec::new(), &history(), 8)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
