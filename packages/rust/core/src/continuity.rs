//! Continuity window: prior section drafts handed to the next drafting step.

use tracing::debug;

use rfpintel_shared::{ContinuityConfig, Result, RfpIntelError, SectionDraft};

const SEPARATOR: &str = "\n\n";

/// Build the context window for drafting section `current_index`.
///
/// Only drafts strictly before `current_index` with non-blank text are used,
/// in ascending index order, each rendered as `Section <i>: <title>` followed
/// by the draft on the next line.
///
/// With `max_chars` set, the oldest sections are dropped until the window
/// fits; if the newest section alone is too long, its draft is cut.
pub fn continuity_window(
    drafts: &[SectionDraft],
    current_index: u32,
    config: &ContinuityConfig,
) -> Result<String> {
    if current_index == 0 {
        return Err(RfpIntelError::validation("current_index must be at least 1"));
    }
    if let Some(bad) = drafts.iter().find(|d| d.index == 0) {
        return Err(RfpIntelError::validation(format!(
            "section draft '{}' has index 0; indexes start at 1",
            bad.title
        )));
    }

    let mut selected: Vec<&SectionDraft> = drafts
        .iter()
        .filter(|d| d.index < current_index)
        .filter(|d| d.draft.as_deref().is_some_and(|t| !t.trim().is_empty()))
        .collect();
    selected.sort_by_key(|d| d.index);

    let blocks: Vec<String> = selected.iter().map(|d| render(d)).collect();

    let window = match config.max_chars {
        Some(budget) => fit_budget(blocks, budget),
        None => blocks.join(SEPARATOR),
    };

    debug!(
        current_index,
        sections = selected.len(),
        chars = window.chars().count(),
        "continuity window built"
    );

    Ok(window)
}

fn render(draft: &SectionDraft) -> String {
    format!(
        "Section {}: {}\n{}",
        draft.index,
        draft.title,
        draft.draft.as_deref().unwrap_or_default().trim()
    )
}

/// Keep the newest blocks that fit in `budget` characters.
fn fit_budget(blocks: Vec<String>, budget: usize) -> String {
    let mut kept: Vec<String> = Vec::new();
    let mut used = 0usize;

    for block in blocks.into_iter().rev() {
        let len = block.chars().count();
        let cost = if kept.is_empty() { len } else { len + SEPARATOR.len() };

        if used + cost <= budget {
            used += cost;
            kept.push(block);
        } else {
            if kept.is_empty() {
                kept.push(block.chars().take(budget).collect());
            }
            break;
        }
    }

    kept.reverse();
    kept.join(SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn drafts() -> Vec<SectionDraft> {
        vec![
            SectionDraft::new(1, "Intro", "body1"),
            SectionDraft::new(2, "Approach", "body2"),
            SectionDraft::new(3, "Staffing", ""),
        ]
    }

    #[test]
    fn includes_only_earlier_non_empty_drafts() {
        let window = continuity_window(&drafts(), 3, &ContinuityConfig::default()).unwrap();

        assert!(window.contains("Section 1: Intro"));
        assert!(window.contains("Section 2: Approach"));
        assert!(!window.contains("Section 3"));
        assert_eq!(window, "Section 1: Intro\nbody1\n\nSection 2: Approach\nbody2");
    }

    #[test]
    fn orders_by_index_regardless_of_input_order() {
        let mut input = drafts();
        input.reverse();
        let window = continuity_window(&input, 5, &ContinuityConfig::default()).unwrap();
        assert!(window.starts_with("Section 1: Intro"));
    }

    #[test]
    fn skips_absent_and_blank_drafts() {
        let input = vec![
            SectionDraft {
                index: 1,
                title: "Cover".into(),
                draft: None,
            },
            SectionDraft::new(2, "Summary", "   \n "),
        ];
        let window = continuity_window(&input, 3, &ContinuityConfig::default()).unwrap();
        assert_eq!(window, "");
    }

    #[test]
    fn first_section_has_empty_window() {
        let window = continuity_window(&drafts(), 1, &ContinuityConfig::default()).unwrap();
        assert!(window.is_empty());
    }

    #[test]
    fn zero_indexes_are_rejected() {
        assert!(continuity_window(&drafts(), 0, &ContinuityConfig::default()).is_err());

        let bad = vec![SectionDraft::new(0, "Preface", "text")];
        let err = continuity_window(&bad, 2, &ContinuityConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Preface"));
    }

    #[test]
    fn budget_drops_oldest_sections_first() {
        // Each block is 32 chars; two blocks plus the separator are 66.
        let input = vec![
            SectionDraft::new(1, "Intro", "aaaaaaaaaaaaaaa"),
            SectionDraft::new(2, "Scope", "bbbbbbbbbbbbbbb"),
            SectionDraft::new(3, "Plans", "ccccccccccccccc"),
        ];
        let config = ContinuityConfig {
            max_chars: Some(66),
        };
        let window = continuity_window(&input, 4, &config).unwrap();
        assert_eq!(
            window,
            "Section 2: Scope\nbbbbbbbbbbbbbbb\n\nSection 3: Plans\nccccccccccccccc"
        );
    }

    #[test]
    fn budget_truncates_newest_when_it_alone_is_too_long() {
        let input = vec![SectionDraft::new(1, "Intro", "a long draft body")];
        let config = ContinuityConfig {
            max_chars: Some(20),
        };
        let window = continuity_window(&input, 2, &config).unwrap();
        assert_eq!(window, "Section 1: Intro\na l");
        assert_eq!(window.chars().count(), 20);
    }
}
