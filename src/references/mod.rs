//! The tagged reference model.
//!
//! A [`Reference`] is one resolved target together with every literal
//! spelling (`matches`) under which it occurs in the tagged text. Two
//! references with the same [`Reference::key`] denote the same target even
//! when their decorative fields differ.

mod author;

pub use author::{Author, DiscordAuthor, UnknownAuthor};

use serde::{Deserialize, Serialize};

/// A link to a Discord channel, thread or message that is not (yet) known to
/// be an archived post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordLinkRef {
    pub url: String,
    pub server: String,
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(rename = "serverJoinURL", default, skip_serializing_if = "Option::is_none")]
    pub server_join_url: Option<String>,
    pub matches: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryTermRef {
    pub term: String,
    pub id: String,
    pub url: String,
    pub matches: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedPostRef {
    pub id: String,
    pub code: String,
    pub url: String,
    pub matches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMentionRef {
    pub user: Author,
    pub matches: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMentionRef {
    #[serde(rename = "channelID")]
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(rename = "channelURL", default, skip_serializing_if = "Option::is_none")]
    pub channel_url: Option<String>,
    pub matches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Reference {
    DiscordLink(DiscordLinkRef),
    DictionaryTerm(DictionaryTermRef),
    ArchivedPost(ArchivedPostRef),
    UserMention(UserMentionRef),
    ChannelMention(ChannelMentionRef),
}

use Reference::*;

impl Reference {
    pub fn matches(&self) -> &[String] {
        match self {
            DiscordLink(link) => &link.matches,
            DictionaryTerm(term) => &term.matches,
            ArchivedPost(post) => &post.matches,
            UserMention(mention) => &mention.matches,
            ChannelMention(mention) => &mention.matches,
        }
    }

    pub fn matches_mut(&mut self) -> &mut Vec<String> {
        match self {
            DiscordLink(link) => &mut link.matches,
            DictionaryTerm(term) => &mut term.matches,
            ArchivedPost(post) => &mut post.matches,
            UserMention(mention) => &mut mention.matches,
            ChannelMention(mention) => &mut mention.matches,
        }
    }

    /// Stable identity of the reference's target.
    ///
    /// Links collapse by server and channel, so a thread link and a link to a
    /// message inside that thread are one reference.
    pub fn key(&self) -> String {
        match self {
            DiscordLink(link) => format!("discordLink:{}/{}", link.server, link.channel),
            DictionaryTerm(term) => format!("dictionaryTerm:{}", term.id),
            ArchivedPost(post) => format!("archivedPost:{}", post.id),
            UserMention(mention) => format!("userMention:{}", mention.user.key()),
            ChannelMention(mention) => format!("channelMention:{}", mention.channel_id),
        }
    }

    /// Field-by-field equality. The order of `matches` is not significant.
    pub fn is_identical_to(&self, other: &Reference) -> bool {
        self.normalized() == other.normalized()
    }

    fn normalized(&self) -> Reference {
        let mut normalized = self.clone();
        let matches = normalized.matches_mut();
        matches.sort();
        matches.dedup();
        normalized
    }

    /// The id of the archive entry or dictionary entry this points at.
    pub fn target_id(&self) -> Option<&str> {
        match self {
            DictionaryTerm(term) => Some(&term.id),
            ArchivedPost(post) => Some(&post.id),
            DiscordLink(_) | UserMention(_) | ChannelMention(_) => None,
        }
    }
}

/// Free-function form of [`Reference::key`].
pub fn reference_key(reference: &Reference) -> String {
    reference.key()
}

/// Free-function form of [`Reference::is_identical_to`].
pub fn are_references_identical(a: &Reference, b: &Reference) -> bool {
    a.is_identical_to(b)
}
