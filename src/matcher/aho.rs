//! Aho–Corasick automaton over case-folded characters.
//!
//! The automaton is generic over its output payload: anything that can name
//! the term it was registered for. Matching is case-insensitive; the
//! case/boundary filtering of [`should_include_match`] then runs against the
//! original text using the payload's own spelling of the term.

use std::collections::{BTreeMap, VecDeque};

use super::should_include_match;

/// A payload stored at a terminal state of the automaton.
pub trait Term {
    fn term(&self) -> &str;
}

impl Term for String {
    fn term(&self) -> &str {
        self
    }
}

/// Lower-case a character when its lower-case form is a single character.
///
/// Multi-character expansions would shift offsets between the folded and the
/// original text, so such characters are compared as written.
pub(crate) fn fold_char(ch: char) -> char {
    let mut lower = ch.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(folded), None) => folded,
        _ => ch,
    }
}

/// One automaton state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AhoNode {
    children: BTreeMap<char, usize>,
    fail: usize,
    /// Indices into [`Automaton::patterns`], including everything reachable
    /// through the fail chain.
    outputs: Vec<usize>,
}

impl AhoNode {
    pub fn child(&self, ch: char) -> Option<usize> {
        self.children.get(&ch).copied()
    }

    pub fn fail(&self) -> usize {
        self.fail
    }

    pub fn outputs(&self) -> &[usize] {
        &self.outputs
    }
}

#[derive(Debug, Clone)]
struct Pattern<O> {
    /// Length of the registered key, in characters.
    len: usize,
    output: O,
}

/// A match reported by [`Automaton::find_matches`]. Offsets are byte offsets
/// into the searched text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionaryMatch<'a, O> {
    pub output: &'a O,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub struct Automaton<O> {
    nodes: Vec<AhoNode>,
    patterns: Vec<Pattern<O>>,
}

impl<O> Default for Automaton<O> {
    fn default() -> Self {
        Automaton {
            nodes: vec![AhoNode::default()],
            patterns: Vec::new(),
        }
    }
}

impl<O: Term> Automaton<O> {
    /// Build the trie for every `(key, outputs)` pair, then assign fail links
    /// breadth-first and fold each fail target's outputs into its node.
    ///
    /// Empty keys are skipped.
    pub fn build<K, I>(terms: I) -> Self
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Vec<O>)>,
    {
        let mut automaton = Automaton::default();

        for (key, outputs) in terms {
            let key = key.as_ref();
            if key.is_empty() {
                continue;
            }
            let (terminal, len) = automaton.insert(key);
            for output in outputs {
                automaton.nodes[terminal].outputs.push(automaton.patterns.len());
                automaton.patterns.push(Pattern { len, output });
            }
        }

        automaton.link_failures();
        automaton
    }

    fn insert(&mut self, key: &str) -> (usize, usize) {
        let mut current = 0;
        let mut len = 0;
        for ch in key.chars().map(fold_char) {
            len += 1;
            current = match self.nodes[current].child(ch) {
                Some(next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(AhoNode::default());
                    self.nodes[current].children.insert(ch, next);
                    next
                }
            };
        }
        (current, len)
    }

    fn link_failures(&mut self) {
        // depth-1 states fail to the root, which is their default
        let mut queue: VecDeque<usize> = self.nodes[0].children.values().copied().collect();

        while let Some(current) = queue.pop_front() {
            let children: Vec<(char, usize)> = self.nodes[current]
                .children
                .iter()
                .map(|(ch, child)| (*ch, *child))
                .collect();

            for (ch, child) in children {
                let mut fail = self.nodes[current].fail;
                while fail != 0 && self.nodes[fail].child(ch).is_none() {
                    fail = self.nodes[fail].fail;
                }
                let target = self.nodes[fail].child(ch).unwrap_or(0);

                self.nodes[child].fail = target;
                let inherited = self.nodes[target].outputs.clone();
                self.nodes[child].outputs.extend(inherited);
                queue.push_back(child);
            }
        }
    }

    /// Scan `text` once and report every occurrence that passes the boundary
    /// filter, in order of the occurrence's end position.
    pub fn find_matches<'a>(&'a self, text: &str) -> Vec<DictionaryMatch<'a, O>> {
        let char_starts: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let mut matches = Vec::new();
        let mut state = 0;

        for (position, (byte, ch)) in text.char_indices().enumerate() {
            let folded = fold_char(ch);
            while state != 0 && self.nodes[state].child(folded).is_none() {
                state = self.nodes[state].fail;
            }
            state = self.nodes[state].child(folded).unwrap_or(0);

            let end = byte + ch.len_utf8();
            for &pattern_index in &self.nodes[state].outputs {
                let pattern = &self.patterns[pattern_index];
                let Some(first) = (position + 1).checked_sub(pattern.len) else {
                    continue;
                };
                let start = char_starts[first];
                if !should_include_match(text, start, end, pattern.output.term()) {
                    continue;
                }
                matches.push(DictionaryMatch {
                    output: &pattern.output,
                    start,
                    end,
                });
            }
        }

        matches
    }
}

impl<O> Automaton<O> {
    pub fn nodes(&self) -> &[AhoNode] {
        &self.nodes
    }

    pub fn outputs(&self) -> impl Iterator<Item = &O> {
        self.patterns.iter().map(|pattern| &pattern.output)
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Follow `key` from the root without falling back.
    pub fn state_for(&self, key: &str) -> Option<usize> {
        key.chars()
            .map(fold_char)
            .try_fold(0, |state, ch| self.nodes[state].child(ch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn automaton(terms: &[&str]) -> Automaton<String> {
        Automaton::build(
            terms
                .iter()
                .map(|term| (term.to_lowercase(), vec![term.to_string()])),
        )
    }

    fn found<'a>(automaton: &'a Automaton<String>, text: &str) -> Vec<(&'a str, usize, usize)> {
        automaton
            .find_matches(text)
            .into_iter()
            .map(|m| (m.output.as_str(), m.start, m.end))
            .collect()
    }

    #[test]
    fn test_fail_links_point_at_longest_proper_suffix() {
        let automaton = automaton(&["he", "she", "hers"]);
        let she = automaton.state_for("she").unwrap();
        let he = automaton.state_for("he").unwrap();
        assert_eq!(automaton.nodes()[she].fail(), he);

        let h = automaton.state_for("h").unwrap();
        assert_eq!(automaton.nodes()[h].fail(), 0, "depth-1 states fail to root");
    }

    #[test]
    fn test_outputs_include_fail_chain() {
        let automaton = automaton(&["he", "she"]);
        let she = automaton.state_for("she").unwrap();
        assert_eq!(
            automaton.nodes()[she].outputs().len(),
            2,
            "'she' also ends 'he'"
        );
    }

    #[test]
    fn test_empty_keys_are_skipped() {
        let automaton: Automaton<String> =
            Automaton::build(vec![(String::new(), vec!["".to_string()])]);
        assert!(automaton.is_empty());
        assert_eq!(automaton.nodes().len(), 1);
    }

    #[test]
    fn test_search_is_case_insensitive_for_mixed_case_terms() {
        let automaton = automaton(&["Redstone"]);
        assert_eq!(
            found(&automaton, "REDSTONE and redstone"),
            vec![("Redstone", 0, 8), ("Redstone", 13, 21)]
        );
    }

    #[test]
    fn test_nested_terms_both_reported() {
        let automaton = automaton(&["mine", "minecraft"]);
        // "mine" is rejected here: "craft" continues the word
        assert_eq!(found(&automaton, "minecraft"), vec![("minecraft", 0, 9)]);
        assert_eq!(
            found(&automaton, "mine minecraft"),
            vec![("mine", 0, 4), ("minecraft", 5, 14)]
        );
    }

    #[test]
    fn test_multiword_terms_and_byte_offsets() {
        let automaton = automaton(&["slime block"]);
        let text = "é slime block";
        assert_eq!(found(&automaton, text), vec![("slime block", 3, 14)]);
        assert_eq!(&text[3..14], "slime block");
    }

    #[test]
    fn test_shared_keys_keep_every_output() {
        let automaton: Automaton<String> = Automaton::build(vec![(
            "piston".to_string(),
            vec!["piston".to_string(), "Piston".to_string()],
        )]);
        assert_eq!(automaton.find_matches("a piston").len(), 2);
    }
}
