//! Change detection between a stored reference list and a fresh one.

use std::collections::{HashMap, HashSet};

use crate::references::Reference;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceDiff {
    pub added: Vec<Reference>,
    pub removed: Vec<Reference>,
    /// New values of references whose key survived but whose fields changed.
    pub updated: Vec<Reference>,
    /// The new list without duplicate keys: kept and added references.
    pub result: Vec<Reference>,
    pub changed: bool,
}

/// Compare two reference lists by key.
///
/// A missing previous list counts as empty, so everything new is `added`.
/// `changed` gates persistence and republishing downstream.
pub fn has_references_changed(old: Option<&[Reference]>, new: &[Reference]) -> ReferenceDiff {
    let old = old.unwrap_or_default();

    let mut old_by_key: HashMap<String, &Reference> = HashMap::with_capacity(old.len());
    for reference in old {
        old_by_key.entry(reference.key()).or_insert(reference);
    }

    let mut diff = ReferenceDiff::default();
    let mut new_keys: HashSet<String> = HashSet::with_capacity(new.len());

    for reference in new {
        let key = reference.key();
        if !new_keys.insert(key.clone()) {
            continue;
        }
        match old_by_key.get(&key) {
            None => diff.added.push(reference.clone()),
            Some(previous) if !previous.is_identical_to(reference) => {
                diff.updated.push(reference.clone())
            }
            Some(_) => {}
        }
        diff.result.push(reference.clone());
    }

    let mut removed_keys: HashSet<String> = HashSet::new();
    for reference in old {
        let key = reference.key();
        if !new_keys.contains(&key) && removed_keys.insert(key) {
            diff.removed.push(reference.clone());
        }
    }

    diff.changed = !diff.added.is_empty() || !diff.removed.is_empty() || !diff.updated.is_empty();
    diff
}
