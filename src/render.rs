//! Re-rendering text with its tagged references turned into links.
//!
//! | Reference | Discord | Website |
//! |-----------|---------|---------|
//! | Dictionary term | `[text](url)`, first occurrence only | same |
//! | Archived post | `[CODE](url)`; bare forum links kept | `[CODE](url)` |
//! | Discord link | `url (in Server)` | `url ([Join Server](invite))` |
//! | User mention | `<@id>` | `[@name](# "ID: id")` |
//! | Channel mention | `<#id>` | `[#name](url)` |
//!
//! Nothing inside a markdown heading line is linked. Inside an existing
//! markdown link only archived posts act, by rewriting the link's target.

use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::index::DiscordServerEntry;
use crate::matcher::{is_discord_forum_link, should_include_match};
use crate::references::{
    ArchivedPostRef, ChannelMentionRef, DictionaryTermRef, DiscordLinkRef, Reference,
    UserMentionRef,
};

/// Servers seen while rendering, keyed by server id.
pub type ServerLinks = BTreeMap<String, DiscordServerEntry>;

/// One occurrence of one of a reference's literal matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMatch<'r> {
    pub start: usize,
    pub end: usize,
    pub reference: &'r Reference,
}

/// An existing `[text](url)` in the rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MarkdownLink {
    start: usize,
    end: usize,
    text: String,
}

impl MarkdownLink {
    fn contains(&self, found: &TextMatch) -> bool {
        self.start <= found.start && found.end <= self.end
    }
}

/// A replacement of `text[start..end]`.
struct Edit {
    start: usize,
    end: usize,
    replacement: String,
}

/// Locate every occurrence of every reference's literal matches.
///
/// Occurrences failing the boundary rules are dropped. Overlaps are resolved
/// by keeping the earliest occurrence, the longer one when two start
/// together.
pub fn find_matches_within_text<'r>(text: &str, references: &'r [Reference]) -> Vec<TextMatch<'r>> {
    let mut found = Vec::new();
    for reference in references {
        for literal in reference.matches().iter().filter(|literal| !literal.is_empty()) {
            for (start, _) in text.match_indices(literal.as_str()) {
                let end = start + literal.len();
                if should_include_match(text, start, end, literal) {
                    found.push(TextMatch {
                        start,
                        end,
                        reference,
                    });
                }
            }
        }
    }

    found.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut kept: Vec<TextMatch<'r>> = Vec::with_capacity(found.len());
    for candidate in found {
        if kept.last().map_or(true, |last| candidate.start >= last.end) {
            kept.push(candidate);
        }
    }
    kept
}

fn find_markdown_links(text: &str) -> Vec<MarkdownLink> {
    static MARKDOWN_LINK_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\[(?<text>[^\[\]]*)\]\((?<url>[^()\n]*)\)").unwrap());

    MARKDOWN_LINK_RE
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            Some(MarkdownLink {
                start: whole.start(),
                end: whole.end(),
                text: captures.name("text")?.as_str().to_string(),
            })
        })
        .collect()
}

/// The match sits on a line that starts with `#`, leading spaces aside.
fn is_in_heading(text: &str, position: usize) -> bool {
    let line_start = text[..position].rfind('\n').map_or(0, |newline| newline + 1);
    text[line_start..position]
        .trim_start_matches([' ', '\t'])
        .starts_with('#')
}

fn replace(found: &TextMatch, replacement: String) -> Option<Edit> {
    Some(Edit {
        start: found.start,
        end: found.end,
        replacement,
    })
}

fn render_dictionary_term(
    term: &DictionaryTermRef,
    found: &TextMatch,
    literal: &str,
    inside_link: bool,
    excluded_ids: &mut HashSet<String>,
) -> Option<Edit> {
    if inside_link || excluded_ids.contains(&term.id) {
        return None;
    }
    excluded_ids.insert(term.id.clone());
    replace(found, format!("[{literal}]({})", term.url))
}

fn render_archived_post(
    post: &ArchivedPostRef,
    found: &TextMatch,
    literal: &str,
    container: Option<&MarkdownLink>,
    is_discord: bool,
) -> Option<Edit> {
    if let Some(link) = container {
        let mut replacement = format!("[{}]({})", link.text, post.url);
        if link.text != post.code {
            replacement.push_str(&format!(" ({})", post.code));
        }
        return Some(Edit {
            start: link.start,
            end: link.end,
            replacement,
        });
    }

    // Discord unfurls its own forum links
    if is_discord && is_discord_forum_link(literal) {
        return None;
    }
    replace(found, format!("[{}]({})", post.code, post.url))
}

fn render_discord_link(
    link: &DiscordLinkRef,
    found: &TextMatch,
    literal: &str,
    inside_link: bool,
    is_discord: bool,
    server_links: &mut ServerLinks,
) -> Option<Edit> {
    let name = link.server_name.as_deref().unwrap_or(&link.server);

    if let Some(join_url) = &link.server_join_url {
        server_links
            .entry(link.server.clone())
            .or_insert_with(|| DiscordServerEntry {
                id: link.server.clone(),
                name: name.to_string(),
                join_url: join_url.clone(),
            });
    }

    if inside_link {
        return None;
    }

    match (is_discord, &link.server_name, &link.server_join_url) {
        (true, Some(server_name), _) => replace(found, format!("{literal} (in {server_name})")),
        (false, _, Some(join_url)) => replace(found, format!("{literal} ([Join {name}]({join_url}))")),
        _ => None,
    }
}

fn render_user_mention(
    mention: &UserMentionRef,
    found: &TextMatch,
    inside_link: bool,
    is_discord: bool,
) -> Option<Edit> {
    let id = mention.user.id()?;
    if inside_link {
        return None;
    }
    match is_discord {
        true => replace(found, format!("<@{id}>")),
        false => replace(
            found,
            format!("[@{}](# \"ID: {id}\")", mention.user.display_name()),
        ),
    }
}

fn render_channel_mention(
    mention: &ChannelMentionRef,
    found: &TextMatch,
    inside_link: bool,
    is_discord: bool,
) -> Option<Edit> {
    if inside_link {
        return None;
    }
    let id = &mention.channel_id;
    if is_discord {
        return replace(found, format!("<#{id}>"));
    }

    let name = mention.channel_name.as_deref().unwrap_or(id);
    match &mention.channel_url {
        Some(url) => replace(found, format!("[#{name}]({url})")),
        None => replace(found, format!("[#{name}](# \"ID: {id}\")")),
    }
}

/// Render `text` with its references linked.
///
/// `excluded_ids` collects dictionary entries already linked; an entry is
/// linked at most once per set. `server_links` collects the servers behind
/// decorated Discord links, first seen wins. Pass fresh containers per
/// document, or share them to link once and collect servers across a batch.
pub fn transform_output_with_references(
    text: &str,
    references: &[Reference],
    is_discord: bool,
    excluded_ids: &mut HashSet<String>,
    server_links: &mut ServerLinks,
) -> String {
    let matches = find_matches_within_text(text, references);
    let links = find_markdown_links(text);

    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;

    for found in matches {
        // already consumed by a rewritten link
        if found.start < cursor {
            continue;
        }
        if is_in_heading(text, found.start) {
            continue;
        }

        let literal = &text[found.start..found.end];
        let container = links.iter().find(|link| link.contains(&found));
        let inside_link = container.is_some();

        let edit = match found.reference {
            Reference::DictionaryTerm(term) => {
                render_dictionary_term(term, &found, literal, inside_link, excluded_ids)
            }
            Reference::ArchivedPost(post) => {
                render_archived_post(post, &found, literal, container, is_discord)
            }
            Reference::DiscordLink(link) => {
                render_discord_link(link, &found, literal, inside_link, is_discord, server_links)
            }
            Reference::UserMention(mention) => {
                render_user_mention(mention, &found, inside_link, is_discord)
            }
            Reference::ChannelMention(mention) => {
                render_channel_mention(mention, &found, inside_link, is_discord)
            }
        };

        let Some(edit) = edit else {
            continue;
        };
        if edit.start < cursor {
            continue;
        }
        output.push_str(&text[cursor..edit.start]);
        output.push_str(&edit.replacement);
        cursor = edit.end;
    }

    output.push_str(&text[cursor..]);
    output
}

pub fn transform_output_with_references_for_discord(text: &str, references: &[Reference]) -> String {
    transform_output_with_references(
        text,
        references,
        true,
        &mut HashSet::new(),
        &mut ServerLinks::new(),
    )
}

pub fn transform_output_with_references_for_website(text: &str, references: &[Reference]) -> String {
    transform_output_with_references(
        text,
        references,
        false,
        &mut HashSet::new(),
        &mut ServerLinks::new(),
    )
}

/// Plain-text rendering for search indexing: posts become their code and
/// mentions their names. Links and dictionary terms stay as written.
pub fn transform_output_for_embeddings(text: &str, references: &[Reference]) -> String {
    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;

    for found in find_matches_within_text(text, references) {
        let replacement = match found.reference {
            Reference::ArchivedPost(post) => post.code.clone(),
            Reference::UserMention(mention) => format!("@{}", mention.user.display_name()),
            Reference::ChannelMention(mention) => format!(
                "#{}",
                mention.channel_name.as_deref().unwrap_or(&mention.channel_id)
            ),
            Reference::DictionaryTerm(_) | Reference::DiscordLink(_) => continue,
        };
        output.push_str(&text[cursor..found.start]);
        output.push_str(&replacement);
        cursor = found.end;
    }

    output.push_str(&text[cursor..]);
    output
}

/// One `- [Join NAME](URL)` line per collected server.
pub fn render_server_links(server_links: &ServerLinks) -> String {
    server_links
        .values()
        .map(|server| format!("- [Join {}]({})", server.name, server.join_url))
        .join("\n")
}
