//! Overlap resolution between candidate spans and merging of references that
//! name the same target.

use std::collections::HashMap;

use crate::references::Reference;

/// A candidate reference together with the byte span it was found at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedSpan {
    pub start: usize,
    pub end: usize,
    pub reference: Reference,
}

impl TaggedSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &TaggedSpan) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Keep a non-overlapping subset of `candidates`, longest spans first and the
/// earlier start on ties, then return the survivors in document order.
pub fn resolve_overlaps(mut candidates: Vec<TaggedSpan>) -> Vec<TaggedSpan> {
    candidates.sort_by(|a, b| b.len().cmp(&a.len()).then(a.start.cmp(&b.start)));

    let mut accepted: Vec<TaggedSpan> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if accepted.iter().all(|kept| !kept.overlaps(&candidate)) {
            accepted.push(candidate);
        }
    }

    accepted.sort_by_key(|span| (span.start, span.end));
    accepted
}

/// Merge references sharing a key. The first instance keeps its fields and
/// gains the literal matches of the later ones.
pub fn deduplicate_references(references: Vec<Reference>) -> Vec<Reference> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<Reference> = Vec::with_capacity(references.len());

    for reference in references {
        let key = reference.key();
        match positions.get(&key) {
            Some(&position) => {
                let matches = merged[position].matches_mut();
                for literal in reference.matches() {
                    if !matches.contains(literal) {
                        matches.push(literal.clone());
                    }
                }
            }
            None => {
                positions.insert(key, merged.len());
                merged.push(reference);
            }
        }
    }

    merged
}
