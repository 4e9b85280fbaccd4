//! Compliance matrix: requirements listed per tracked section (L, M, C).

use std::collections::HashMap;

use tracing::debug;

use rfpintel_shared::{ComplianceMatrix, Requirement, SectionKey, SectionMap};

use crate::requirements::RequirementExtractor;

/// Run the extractor over the L, M and C buffers independently.
///
/// No deduplication across sections: a sentence quoted in both L and M shows
/// up in both lists.
pub fn build_matrix(sections: &SectionMap, extractor: &RequirementExtractor) -> ComplianceMatrix {
    let matrix = ComplianceMatrix {
        section_l: extractor.extract(sections.get(SectionKey::L), Some(SectionKey::L)),
        section_m: extractor.extract(sections.get(SectionKey::M), Some(SectionKey::M)),
        section_c: extractor.extract(sections.get(SectionKey::C), Some(SectionKey::C)),
    };

    debug!(
        section_l = matrix.section_l.len(),
        section_m = matrix.section_m.len(),
        section_c = matrix.section_c.len(),
        "compliance matrix built"
    );

    matrix
}

/// Copy ids and aliases from `assigned` onto matching matrix entries.
///
/// Entries match on source section plus case-insensitive text.
pub fn link_ids(matrix: &mut ComplianceMatrix, assigned: &[Requirement]) {
    let lookup: HashMap<(Option<SectionKey>, String), &Requirement> = assigned
        .iter()
        .filter(|r| r.id.is_some())
        .map(|r| ((r.source_section, r.text.to_lowercase()), r))
        .collect();

    for entry in matrix
        .section_l
        .iter_mut()
        .chain(matrix.section_m.iter_mut())
        .chain(matrix.section_c.iter_mut())
    {
        if let Some(source) = lookup.get(&(entry.source_section, entry.text.to_lowercase())) {
            entry.id = source.id.clone();
            entry.aliases = source.aliases.clone();
        }
    }
}
