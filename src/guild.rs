//! The narrow interface through which the tagger reaches the rest of the
//! bot, and a snapshot-backed implementation of it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, TaggingError};
use crate::index::{
    build_dictionary_index, ArchiveIndex, ChannelInfo, DictionaryIndexEntry, DictionaryTermIndex,
    DiscordServerEntry, ServerDirectory,
};
use crate::references::Author;

/// Everything the tagger needs from the guild it tags for.
///
/// Index accessors hand out immutable snapshots; a tagging call fetches each
/// one once and uses it for the whole call.
#[allow(async_fn_in_trait)]
pub trait GuildContext {
    fn guild_id(&self) -> &str;

    async fn archive_index(&self) -> Result<Arc<ArchiveIndex>>;

    async fn dictionary_index(&self) -> Result<Arc<DictionaryTermIndex>>;

    async fn server_directory(&self) -> Result<Arc<ServerDirectory>>;

    /// Classify a user id against the guild's current membership.
    async fn resolve_author(&self, user_id: &str) -> Result<Author>;

    async fn lookup_channel(&self, channel_id: &str) -> Result<ChannelInfo>;
}

/// On-disk form of a [`SnapshotGuild`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildSnapshot {
    pub guild_id: String,
    #[serde(default)]
    pub archive: ArchiveIndex,
    #[serde(default)]
    pub dictionary: Vec<DictionaryIndexEntry>,
    #[serde(default)]
    pub servers: Vec<DiscordServerEntry>,
    /// Users as last classified, keyed by their id.
    #[serde(default)]
    pub members: Vec<Author>,
    #[serde(default)]
    pub channels: Vec<ChannelInfo>,
}

/// A [`GuildContext`] answering from a fixed snapshot.
pub struct SnapshotGuild {
    guild_id: String,
    archive: Arc<ArchiveIndex>,
    dictionary: Arc<DictionaryTermIndex>,
    servers: Arc<ServerDirectory>,
    members: HashMap<String, Author>,
    channels: HashMap<String, ChannelInfo>,
}

impl SnapshotGuild {
    pub fn from_snapshot(snapshot: GuildSnapshot) -> SnapshotGuild {
        let members = snapshot
            .members
            .into_iter()
            .filter_map(|author| Some((author.id()?.to_string(), author)))
            .collect();
        let channels = snapshot
            .channels
            .into_iter()
            .map(|channel| (channel.id.clone(), channel))
            .collect();

        SnapshotGuild {
            guild_id: snapshot.guild_id,
            archive: Arc::new(snapshot.archive),
            dictionary: Arc::new(build_dictionary_index(snapshot.dictionary)),
            servers: Arc::new(ServerDirectory::new(snapshot.servers)),
            members,
            channels,
        }
    }

    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<SnapshotGuild> {
        let text = std::fs::read_to_string(path)?;
        let snapshot: GuildSnapshot = serde_json::from_str(&text)?;
        debug!(
            path = %path.display(),
            entries = snapshot.archive.code_to_id.len(),
            terms = snapshot.dictionary.len(),
            "loaded guild snapshot"
        );
        Ok(SnapshotGuild::from_snapshot(snapshot))
    }

    /// Use a different guild id than the one recorded in the snapshot.
    pub fn with_guild_id(mut self, guild_id: impl Into<String>) -> SnapshotGuild {
        self.guild_id = guild_id.into();
        self
    }
}

impl GuildContext for SnapshotGuild {
    fn guild_id(&self) -> &str {
        &self.guild_id
    }

    async fn archive_index(&self) -> Result<Arc<ArchiveIndex>> {
        Ok(Arc::clone(&self.archive))
    }

    async fn dictionary_index(&self) -> Result<Arc<DictionaryTermIndex>> {
        Ok(Arc::clone(&self.dictionary))
    }

    async fn server_directory(&self) -> Result<Arc<ServerDirectory>> {
        Ok(Arc::clone(&self.servers))
    }

    async fn resolve_author(&self, user_id: &str) -> Result<Author> {
        self.members
            .get(user_id)
            .cloned()
            .ok_or_else(|| TaggingError::UnknownUser(user_id.to_string()))
    }

    async fn lookup_channel(&self, channel_id: &str) -> Result<ChannelInfo> {
        self.channels
            .get(channel_id)
            .cloned()
            .ok_or_else(|| TaggingError::UnknownChannel(channel_id.to_string()))
    }
}
