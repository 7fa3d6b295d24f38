//! Finding references in free text.
//!
//! [`tag_references_in_text`] is the pure, synchronous core: regex and
//! dictionary matches become candidate spans, overlapping spans are resolved
//! and equal targets merged. [`tag_references`] wraps it with the guild's
//! snapshots: Discord links are upgraded to archived posts or decorated with
//! server details, self references are dropped, and mentions are enriched.

use itertools::Itertools;
use tracing::{debug, warn};

use crate::error::Result;
use crate::guild::GuildContext;
use crate::index::{ArchiveIndex, DictionaryStatus, DictionaryTermIndex, ServerDirectory};
use crate::markdown::{records_to_raw_text_no_headers, strip_hyperlink_names, SubmissionRecords};
use crate::matcher::{
    find_regex_matches, RegexMatch, CHANNEL_MENTION_RE, DISCORD_FORUM_LINK_RE, POST_CODE_RE,
    USER_MENTION_RE,
};
use crate::overlap::{deduplicate_references, resolve_overlaps, TaggedSpan};
use crate::references::{
    ArchivedPostRef, Author, ChannelMentionRef, DictionaryTermRef, DiscordLinkRef, Reference,
    UserMentionRef,
};

fn span(found: &RegexMatch, reference: Reference) -> TaggedSpan {
    TaggedSpan {
        start: found.start,
        end: found.end,
        reference,
    }
}

fn discord_link_candidates(text: &str) -> impl Iterator<Item = TaggedSpan> + '_ {
    find_regex_matches(text, &[&*DISCORD_FORUM_LINK_RE])
        .into_iter()
        .filter_map(|found| {
            // near-misses without both ids are not links
            let (Some(server), Some(channel)) = (found.group(1), found.group(2)) else {
                return None;
            };
            let reference = Reference::DiscordLink(DiscordLinkRef {
                url: found.matched.clone(),
                server: server.to_string(),
                channel: channel.to_string(),
                message: found.group(3).map(String::from),
                server_name: None,
                server_join_url: None,
                matches: vec![found.matched.clone()],
            });
            Some(span(&found, reference))
        })
}

fn user_mention_candidates(text: &str) -> impl Iterator<Item = TaggedSpan> + '_ {
    find_regex_matches(text, &[&*USER_MENTION_RE])
        .into_iter()
        .filter_map(|found| {
            let reference = Reference::UserMention(UserMentionRef {
                user: Author::unresolved(found.group(1)?),
                matches: vec![found.matched.clone()],
            });
            Some(span(&found, reference))
        })
}

fn channel_mention_candidates(text: &str) -> impl Iterator<Item = TaggedSpan> + '_ {
    find_regex_matches(text, &[&*CHANNEL_MENTION_RE])
        .into_iter()
        .filter_map(|found| {
            let reference = Reference::ChannelMention(ChannelMentionRef {
                channel_id: found.group(1)?.to_string(),
                channel_name: None,
                channel_url: None,
                matches: vec![found.matched.clone()],
            });
            Some(span(&found, reference))
        })
}

fn post_code_candidates<'a>(
    text: &'a str,
    archive: &'a ArchiveIndex,
) -> impl Iterator<Item = TaggedSpan> + 'a {
    find_regex_matches(text, &[&*POST_CODE_RE])
        .into_iter()
        .filter_map(move |found| {
            // unknown codes are left as plain text
            let post = archive.resolve_code(&found.matched)?;
            let reference = Reference::ArchivedPost(ArchivedPostRef {
                id: post.id,
                code: post.code,
                url: post.url,
                matches: vec![found.matched.clone()],
            });
            Some(span(&found, reference))
        })
}

fn dictionary_candidates<'a>(
    text: &'a str,
    dictionary: &'a DictionaryTermIndex,
) -> impl Iterator<Item = TaggedSpan> + 'a {
    dictionary
        .find_matches(text)
        .into_iter()
        .filter(|found| found.output.status == DictionaryStatus::Approved)
        .map(move |found| TaggedSpan {
            start: found.start,
            end: found.end,
            reference: Reference::DictionaryTerm(DictionaryTermRef {
                term: found.output.term.clone(),
                id: found.output.id.clone(),
                url: found.output.url.clone(),
                matches: vec![text[found.start..found.end].to_string()],
            }),
        })
}

/// Find every reference in `text` against the given snapshots.
///
/// Post codes are only looked for when an archive index is given, dictionary
/// terms only when a dictionary is given. The result is in document order
/// with one reference per target.
pub fn tag_references_in_text(
    text: &str,
    dictionary: Option<&DictionaryTermIndex>,
    archive: Option<&ArchiveIndex>,
) -> Vec<Reference> {
    let mut candidates: Vec<TaggedSpan> = discord_link_candidates(text)
        .chain(user_mention_candidates(text))
        .chain(channel_mention_candidates(text))
        .collect();

    if let Some(archive) = archive {
        candidates.extend(post_code_candidates(text, archive));
    }
    if let Some(dictionary) = dictionary {
        candidates.extend(dictionary_candidates(text, dictionary));
    }

    let references = resolve_overlaps(candidates)
        .into_iter()
        .map(|span| span.reference)
        .collect_vec();

    deduplicate_references(references)
}

/// A previously tagged archived post that already covered one of `matches`.
fn carried_forward<'a>(matches: &[String], previous: &'a [Reference]) -> Option<&'a ArchivedPostRef> {
    previous.iter().find_map(|reference| match reference {
        Reference::ArchivedPost(post)
            if post.matches.iter().any(|literal| matches.contains(literal)) =>
        {
            Some(post)
        }
        _ => None,
    })
}

/// Resolve a raw link into the reference it should be stored as.
fn resolve_discord_link(
    link: DiscordLinkRef,
    previous: &[Reference],
    guild_id: &str,
    archive: &ArchiveIndex,
    servers: &ServerDirectory,
) -> Reference {
    if let Some(post) = carried_forward(&link.matches, previous) {
        return Reference::ArchivedPost(ArchivedPostRef {
            matches: link.matches,
            ..post.clone()
        });
    }

    if link.server == guild_id {
        return match archive.resolve_thread(&link.channel) {
            Some(post) => Reference::ArchivedPost(ArchivedPostRef {
                id: post.id,
                code: post.code,
                url: post.url,
                matches: link.matches,
            }),
            None => Reference::DiscordLink(link),
        };
    }

    match servers.get(&link.server) {
        Some(server) => Reference::DiscordLink(DiscordLinkRef {
            server_name: Some(server.name.clone()),
            server_join_url: Some(server.join_url.clone()),
            ..link
        }),
        None => Reference::DiscordLink(link),
    }
}

fn is_self_reference(reference: &Reference, self_id: Option<&str>) -> bool {
    matches!(
        (reference, self_id),
        (Reference::DictionaryTerm(_) | Reference::ArchivedPost(_), Some(self_id))
            if reference.target_id() == Some(self_id)
    )
}

/// Fill in live user and channel details. Lookup failures leave the
/// reference as it is.
async fn enrich_reference<G: GuildContext>(reference: &mut Reference, guild: &G) {
    match reference {
        Reference::UserMention(mention) => {
            let Some(user_id) = mention.user.id().map(str::to_string) else {
                return;
            };
            match guild.resolve_author(&user_id).await {
                Ok(author) => mention.user = author,
                Err(err) => warn!(user = %user_id, error = %err, "could not classify mentioned user"),
            }
        }
        Reference::ChannelMention(mention) => match guild.lookup_channel(&mention.channel_id).await {
            Ok(channel) => {
                mention.channel_name = Some(channel.name);
                mention.channel_url = channel.url;
            }
            Err(err) => warn!(
                channel = %mention.channel_id,
                error = %err,
                "could not look up mentioned channel"
            ),
        },
        Reference::DiscordLink(_) | Reference::DictionaryTerm(_) | Reference::ArchivedPost(_) => {}
    }
}

/// Tag `text` for the guild.
///
/// `previous` is the reference list stored for the same text, used to carry
/// known archive links forward. References to `self_id` are dropped.
pub async fn tag_references<G: GuildContext>(
    text: &str,
    previous: &[Reference],
    guild: &G,
    self_id: Option<&str>,
    skip_terms: bool,
) -> Result<Vec<Reference>> {
    let text = strip_hyperlink_names(text);

    let archive = guild.archive_index().await?;
    let dictionary = match skip_terms {
        true => None,
        false => Some(guild.dictionary_index().await?),
    };
    let servers = guild.server_directory().await?;

    let candidates = tag_references_in_text(&text, dictionary.as_deref(), Some(&*archive));

    let resolved = candidates
        .into_iter()
        .map(|reference| match reference {
            Reference::DiscordLink(link) => {
                resolve_discord_link(link, previous, guild.guild_id(), &archive, &servers)
            }
            other => other,
        })
        .filter(|reference| !is_self_reference(reference, self_id))
        .collect_vec();

    let mut references = deduplicate_references(resolved);
    for reference in references.iter_mut() {
        enrich_reference(reference, guild).await;
    }

    debug!(count = references.len(), "tagged references");
    Ok(references)
}

pub async fn tag_references_in_submission_records<G: GuildContext>(
    records: &SubmissionRecords,
    previous: &[Reference],
    guild: &G,
    self_id: Option<&str>,
) -> Result<Vec<Reference>> {
    let text = records_to_raw_text_no_headers(records);
    tag_references(&text, previous, guild, self_id, false).await
}

/// Tag the acknowledgement reasons given for an entry's authors. Dictionary
/// terms are not tagged here.
pub async fn tag_references_in_acknowledgements<G: GuildContext>(
    authors: &[Author],
    previous: &[Reference],
    guild: &G,
    self_id: Option<&str>,
) -> Result<Vec<Reference>> {
    let text = authors.iter().filter_map(Author::reason).join("\n");
    tag_references(&text, previous, guild, self_id, true).await
}

/// Re-enrich the stored user and channel mentions of `references` without
/// re-tagging. Other references are returned as they are.
pub async fn refresh_mentions<G: GuildContext>(references: &[Reference], guild: &G) -> Vec<Reference> {
    let mut refreshed = references.to_vec();
    for reference in refreshed.iter_mut() {
        enrich_reference(reference, guild).await;
    }
    refreshed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build_dictionary_index;
    use crate::test_utils::{
        sample_archive_index, sample_dictionary_entries, sample_guild, TEST_GUILD_ID,
    };

    fn keys(references: &[Reference]) -> Vec<String> {
        references.iter().map(Reference::key).collect()
    }

    #[test]
    fn test_lighthouse_is_not_light() {
        let dictionary = build_dictionary_index(sample_dictionary_entries());
        assert!(tag_references_in_text("the lighthouse", Some(&dictionary), None).is_empty());

        let tagged = tag_references_in_text("the lights", Some(&dictionary), None);
        assert_eq!(keys(&tagged), vec!["dictionaryTerm:dict-light"]);
        assert_eq!(tagged[0].matches(), ["lights".to_string()]);
    }

    #[test]
    fn test_all_caps_term_matches_only_exact_case() {
        let dictionary = build_dictionary_index(sample_dictionary_entries());
        let tagged = tag_references_in_text("Our API is great, the api is not", Some(&dictionary), None);
        assert_eq!(keys(&tagged), vec!["dictionaryTerm:dict-api"]);
        assert_eq!(tagged[0].matches(), ["API".to_string()]);
    }

    #[test]
    fn test_number_terms_respect_digit_boundaries() {
        let dictionary = build_dictionary_index(sample_dictionary_entries());
        assert!(tag_references_in_text("20245 and 120245", Some(&dictionary), None).is_empty());
        assert_eq!(
            keys(&tag_references_in_text("Released 2024.", Some(&dictionary), None)),
            vec!["dictionaryTerm:dict-2024"]
        );
    }

    #[test]
    fn test_longer_phrase_wins_over_nested_term() {
        let dictionary = build_dictionary_index(sample_dictionary_entries());
        let tagged = tag_references_in_text("a flying machine is fun", Some(&dictionary), None);
        assert_eq!(keys(&tagged), vec!["dictionaryTerm:dict-flying-machine"]);
    }

    #[test]
    fn test_pending_terms_are_invisible() {
        let dictionary = build_dictionary_index(sample_dictionary_entries());
        assert!(tag_references_in_text("redstone dust", Some(&dictionary), None).is_empty());
    }

    #[test]
    fn test_post_codes_need_an_archive() {
        let archive = sample_archive_index();
        assert!(tag_references_in_text("see ABC123", None, None).is_empty());

        let tagged = tag_references_in_text("see ABC123 and ZZZ999", None, Some(&archive));
        assert_eq!(keys(&tagged), vec!["archivedPost:entry-abc"]);
    }

    #[test]
    fn test_repeated_targets_merge_in_document_order() {
        let archive = sample_archive_index();
        let dictionary = build_dictionary_index(sample_dictionary_entries());
        let text = "<@42> light ABC123, Light and abc123 <#555>";
        let tagged = tag_references_in_text(text, Some(&dictionary), Some(&archive));

        assert_eq!(
            keys(&tagged),
            vec![
                "userMention:42",
                "dictionaryTerm:dict-light",
                "archivedPost:entry-abc",
                "channelMention:555",
            ]
        );
        assert_eq!(tagged[1].matches(), ["light".to_string(), "Light".to_string()]);
        assert_eq!(tagged[2].matches(), ["ABC123".to_string(), "abc123".to_string()]);
    }

    #[test]
    fn test_tagging_is_idempotent() {
        let archive = sample_archive_index();
        let dictionary = build_dictionary_index(sample_dictionary_entries());
        let text = "light DEF456 https://discord.com/channels/900/77 minecraft";
        assert_eq!(
            tag_references_in_text(text, Some(&dictionary), Some(&archive)),
            tag_references_in_text(text, Some(&dictionary), Some(&archive))
        );
    }

    #[tokio::test]
    async fn test_same_guild_link_becomes_archived_post() {
        let guild = sample_guild();
        let url = format!("https://discord.com/channels/{TEST_GUILD_ID}/1002");
        let tagged = tag_references(&format!("built on {url}"), &[], &guild, None, false)
            .await
            .unwrap();

        assert_eq!(
            tagged,
            vec![Reference::ArchivedPost(ArchivedPostRef {
                id: "entry-def".into(),
                code: "DEF456".into(),
                url: "https://archive.example/DEF456".into(),
                matches: vec![url],
            })]
        );
    }

    #[tokio::test]
    async fn test_thread_and_code_merge_into_one_post() {
        let guild = sample_guild();
        let url = format!("https://discord.com/channels/{TEST_GUILD_ID}/1002/3");
        let tagged = tag_references(&format!("DEF456 ({url})"), &[], &guild, None, false)
            .await
            .unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].matches(), ["DEF456".to_string(), url]);
    }

    #[tokio::test]
    async fn test_external_link_is_decorated_from_directory() {
        let guild = sample_guild();
        let tagged = tag_references(
            "https://discord.com/channels/900/77 and https://discord.com/channels/901/1",
            &[],
            &guild,
            None,
            false,
        )
        .await
        .unwrap();

        match (&tagged[0], &tagged[1]) {
            (Reference::DiscordLink(known), Reference::DiscordLink(unknown)) => {
                assert_eq!(known.server_name.as_deref(), Some("Storage Tech"));
                assert_eq!(known.server_join_url.as_deref(), Some("https://discord.gg/storagetech"));
                assert_eq!(unknown.server_name, None);
            }
            other => panic!("unexpected references {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_previous_archive_resolution_is_carried_forward() {
        let guild = sample_guild();
        let url = format!("https://discord.com/channels/{TEST_GUILD_ID}/7777");
        let previous = vec![Reference::ArchivedPost(ArchivedPostRef {
            id: "entry-old".into(),
            code: "OLD001".into(),
            url: "https://archive.example/OLD001".into(),
            matches: vec![url.clone()],
        })];

        let tagged = tag_references(&url, &previous, &guild, None, false).await.unwrap();
        assert_eq!(keys(&tagged), vec!["archivedPost:entry-old"]);
    }

    #[tokio::test]
    async fn test_self_references_are_dropped() {
        let guild = sample_guild();
        let tagged = tag_references("ABC123 and DEF456", &[], &guild, Some("entry-abc"), false)
            .await
            .unwrap();
        assert_eq!(keys(&tagged), vec!["archivedPost:entry-def"]);
    }

    #[tokio::test]
    async fn test_link_labels_are_not_tagged() {
        let guild = sample_guild();
        let tagged = tag_references("[light](https://example.com/x)", &[], &guild, None, false)
            .await
            .unwrap();
        assert!(tagged.is_empty(), "the label is stripped before tagging");
    }

    #[tokio::test]
    async fn test_mentions_are_enriched_or_degrade() {
        let guild = sample_guild();
        let tagged = tag_references("<@42> <@43> <#555> <#556>", &[], &guild, None, true)
            .await
            .unwrap();
        assert_eq!(tagged.len(), 4);

        match &tagged[0] {
            Reference::UserMention(mention) => assert_eq!(mention.user.display_name(), "Alice"),
            other => panic!("unexpected reference {other:?}"),
        }
        match &tagged[1] {
            Reference::UserMention(mention) => assert_eq!(mention.user, Author::unresolved("43")),
            other => panic!("unexpected reference {other:?}"),
        }
        match (&tagged[2], &tagged[3]) {
            (Reference::ChannelMention(known), Reference::ChannelMention(unknown)) => {
                assert_eq!(known.channel_name.as_deref(), Some("general"));
                assert_eq!(unknown.channel_name, None);
            }
            other => panic!("unexpected references {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_mentions_updates_stale_details() {
        let guild = sample_guild();
        let stored = vec![
            Reference::UserMention(UserMentionRef {
                user: Author::unresolved("42"),
                matches: vec!["<@42>".into()],
            }),
            Reference::ChannelMention(ChannelMentionRef {
                channel_id: "555".into(),
                channel_name: Some("old-name".into()),
                channel_url: None,
                matches: vec!["<#555>".into()],
            }),
            Reference::ArchivedPost(ArchivedPostRef {
                id: "entry-abc".into(),
                code: "ABC123".into(),
                url: "https://archive.example/ABC123".into(),
                matches: vec!["ABC123".into()],
            }),
        ];

        let refreshed = refresh_mentions(&stored, &guild).await;
        assert_eq!(keys(&refreshed), keys(&stored), "identities are unchanged");
        match (&refreshed[0], &refreshed[1]) {
            (Reference::UserMention(user), Reference::ChannelMention(channel)) => {
                assert_eq!(user.user.display_name(), "Alice");
                assert_eq!(channel.channel_name.as_deref(), Some("general"));
            }
            other => panic!("unexpected references {other:?}"),
        }
        assert_eq!(refreshed[2], stored[2]);
    }

    #[tokio::test]
    async fn test_skip_terms() {
        let guild = sample_guild();
        let tagged = tag_references("light", &[], &guild, None, true).await.unwrap();
        assert!(tagged.is_empty());
    }

    #[tokio::test]
    async fn test_acknowledgement_reasons_are_tagged() {
        let guild = sample_guild();
        let authors = vec![
            Author::DiscordInGuild(crate::references::DiscordAuthor {
                id: "42".into(),
                username: "alice".into(),
                reason: Some("Original design in ABC123".into()),
                ..Default::default()
            }),
            Author::unresolved("43"),
        ];
        let tagged = tag_references_in_acknowledgements(&authors, &[], &guild, Some("entry-def"))
            .await
            .unwrap();
        assert_eq!(keys(&tagged), vec!["archivedPost:entry-abc"]);
    }
}
