//! Shared fixtures for the unit tests.
//!
//! Everything here describes one small guild: two archived posts, a handful of
//! dictionary terms, one partner server, one member and one channel.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::guild::{GuildSnapshot, SnapshotGuild};
use crate::index::{
    ArchiveIndex, ChannelInfo, DictionaryIndexEntry, DictionaryStatus, DiscordServerEntry,
};
use crate::references::{Author, DiscordAuthor};

pub const TEST_GUILD_ID: &str = "100";

fn pairs(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// `ABC123` (thread 1001) and `DEF456` (thread 1002).
pub fn sample_archive_index() -> ArchiveIndex {
    ArchiveIndex {
        code_to_id: pairs(&[("ABC123", "entry-abc"), ("DEF456", "entry-def")]),
        thread_to_code: pairs(&[("1001", "ABC123"), ("1002", "DEF456")]),
        id_to_url: pairs(&[
            ("entry-abc", "https://archive.example/ABC123"),
            ("entry-def", "https://archive.example/DEF456"),
        ]),
    }
}

fn entry(term: &str, id: &str, status: DictionaryStatus) -> DictionaryIndexEntry {
    DictionaryIndexEntry {
        term: term.to_string(),
        id: id.to_string(),
        url: format!("https://dict.example/{id}"),
        status,
    }
}

/// Approved terms plus one pending term, `redstone`.
pub fn sample_dictionary_entries() -> Vec<DictionaryIndexEntry> {
    vec![
        entry("light", "dict-light", DictionaryStatus::Approved),
        entry("API", "dict-api", DictionaryStatus::Approved),
        entry("2024", "dict-2024", DictionaryStatus::Approved),
        entry("minecraft", "dict-minecraft", DictionaryStatus::Approved),
        entry("mine", "dict-mine", DictionaryStatus::Approved),
        entry("flying machine", "dict-flying-machine", DictionaryStatus::Approved),
        entry("machine", "dict-machine", DictionaryStatus::Approved),
        entry("redstone", "dict-redstone", DictionaryStatus::Pending),
    ]
}

pub fn sample_snapshot() -> GuildSnapshot {
    GuildSnapshot {
        guild_id: TEST_GUILD_ID.to_string(),
        archive: sample_archive_index(),
        dictionary: sample_dictionary_entries(),
        servers: vec![DiscordServerEntry {
            id: "900".to_string(),
            name: "Storage Tech".to_string(),
            join_url: "https://discord.gg/storagetech".to_string(),
        }],
        members: vec![Author::DiscordInGuild(DiscordAuthor {
            id: "42".to_string(),
            username: "alice".to_string(),
            display_name: Some("Alice".to_string()),
            ..Default::default()
        })],
        channels: vec![ChannelInfo {
            id: "555".to_string(),
            name: "general".to_string(),
            url: Some(format!("https://discord.com/channels/{TEST_GUILD_ID}/555")),
        }],
    }
}

pub fn sample_guild() -> SnapshotGuild {
    SnapshotGuild::from_snapshot(sample_snapshot())
}

/// Creates a non-hidden directory inside a fresh temp dir.
///
/// Some platforms create temp dirs under hidden paths such as `/tmp/.tmpXXXX`,
/// and directory walks skip hidden entries below their root.
pub fn create_test_archive_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let archive_dir = temp_dir.path().join("archive");
    fs::create_dir(&archive_dir).expect("Failed to create archive subdirectory");
    (temp_dir, archive_dir)
}
