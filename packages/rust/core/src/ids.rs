//! Requirement identifier normalization and allocation.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use rfpintel_shared::{Requirement, RequirementId};

static ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:req-(\d+)|reqid[\s:#]*(\d+))\b").expect("valid regex")
});

/// Explicit ids in `text`, normalized and deduplicated, in order of first
/// appearance.
pub fn explicit_ids(text: &str) -> Vec<RequirementId> {
    let mut seen = HashSet::new();
    ID_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .filter_map(|digits| RequirementId::from_digits(digits.as_str()))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Normalize the ids mentioned in `text`; with none, fall back to exactly one
/// id built from `fallback`.
pub fn normalize_ids(text: &str, fallback: u64) -> Vec<RequirementId> {
    let ids = explicit_ids(text);
    if ids.is_empty() {
        vec![RequirementId::from_number(fallback)]
    } else {
        ids
    }
}

/// Assigns ids across one requirement list without collisions.
///
/// Every explicit id in the list is reserved up front, so a positional
/// fallback never takes an id that some later requirement names explicitly.
#[derive(Debug, Default)]
pub struct IdAllocator {
    reserved: HashSet<RequirementId>,
    assigned: HashSet<RequirementId>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `id` and `aliases` on every requirement.
    ///
    /// The primary id is the first explicit id not already taken by an
    /// earlier requirement; other explicit ids become aliases. Requirements
    /// without a free explicit id get `REQ-<position>`, bumped past any
    /// reserved or assigned number.
    pub fn assign(&mut self, requirements: &mut [Requirement]) {
        let explicit: Vec<Vec<RequirementId>> =
            requirements.iter().map(|r| explicit_ids(&r.text)).collect();
        self.reserved.extend(explicit.iter().flatten().cloned());

        let mut fallbacks = 0usize;
        for (position, (req, ids)) in requirements.iter_mut().zip(explicit).enumerate() {
            let primary = ids.iter().find(|id| !self.assigned.contains(*id)).cloned();

            let id = match primary {
                Some(id) => id,
                None => {
                    fallbacks += 1;
                    self.next_fallback(position as u64 + 1)
                }
            };

            req.aliases = ids.into_iter().filter(|alias| *alias != id).collect();
            self.assigned.insert(id.clone());
            req.id = Some(id);
        }

        debug!(
            requirements = requirements.len(),
            reserved = self.reserved.len(),
            fallbacks,
            "requirement ids assigned"
        );
    }

    fn next_fallback(&self, start: u64) -> RequirementId {
        let mut number = start;
        loop {
            let candidate = RequirementId::from_number(number);
            if !self.reserved.contains(&candidate) && !self.assigned.contains(&candidate) {
                return candidate;
            }
            number += 1;
        }
    }
}

/// Assign ids to `requirements` with a fresh allocator.
pub fn assign_ids(requirements: &mut [Requirement]) {
    IdAllocator::new().assign(requirements);
}
