//! Text matching primitives: the regex extractor, the dictionary automaton,
//! and the boundary rules both of them share with the renderer.

mod aho;
mod boundary;

pub(crate) use aho::fold_char;
pub use aho::{AhoNode, Automaton, DictionaryMatch, Term};
pub use boundary::should_include_match;

use once_cell::sync::Lazy;
use regex::Regex;

/// `https://discord.com/channels/<server>/<channel>[/<message>]`, including
/// the canary/ptb hosts.
pub static DISCORD_FORUM_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:canary\.|ptb\.)?discord(?:app)?\.com/channels/(\d+)/(\d+)(?:/(\d+))?")
        .unwrap()
});

/// Archive post codes such as `ABC123`, on ASCII word boundaries.
pub static POST_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u:\b)([A-Za-z]+[0-9]{3})(?-u:\b)").unwrap());

pub static USER_MENTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<@!?(\d+)>").unwrap());

pub static CHANNEL_MENTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<#(\d+)>").unwrap());

/// One hit of [`find_regex_matches`]. `groups` holds capture groups 1..n.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexMatch {
    pub pattern: String,
    pub matched: String,
    pub start: usize,
    pub end: usize,
    pub groups: Vec<Option<String>>,
}

impl RegexMatch {
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index.checked_sub(1)?)?.as_deref()
    }
}

/// Collect every match of every pattern, pattern by pattern, left to right.
///
/// An empty match advances the scan by one character.
pub fn find_regex_matches(text: &str, patterns: &[&Regex]) -> Vec<RegexMatch> {
    let mut results = Vec::new();

    for pattern in patterns {
        let mut position = 0;
        while position <= text.len() {
            let Some(captures) = pattern.captures_at(text, position) else {
                break;
            };
            let Some(whole) = captures.get(0) else {
                break;
            };

            results.push(RegexMatch {
                pattern: pattern.as_str().to_string(),
                matched: whole.as_str().to_string(),
                start: whole.start(),
                end: whole.end(),
                groups: captures
                    .iter()
                    .skip(1)
                    .map(|group| group.map(|m| m.as_str().to_string()))
                    .collect(),
            });

            position = if whole.is_empty() {
                whole.end() + text[whole.end()..].chars().next().map_or(1, char::len_utf8)
            } else {
                whole.end()
            };
        }
    }

    results
}

/// True when the whole of `text` is a Discord channel/thread/message link.
pub fn is_discord_forum_link(text: &str) -> bool {
    DISCORD_FORUM_LINK_RE
        .find(text)
        .is_some_and(|m| m.start() == 0 && m.end() == text.len())
}
