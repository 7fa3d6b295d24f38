//! Read-only snapshots of the collaborator indices consumed by the tagger.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::matcher::{fold_char, Automaton, Term};

/// Lookup tables published by the archive: post code → entry id, thread id →
/// post code, entry id → canonical URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveIndex {
    #[serde(rename = "codeToID", default)]
    pub code_to_id: HashMap<String, String>,
    #[serde(rename = "threadToCode", default)]
    pub thread_to_code: HashMap<String, String>,
    #[serde(rename = "idToURL", default)]
    pub id_to_url: HashMap<String, String>,
}

/// An archive entry reached through the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPost {
    pub id: String,
    pub code: String,
    pub url: String,
}

impl ArchiveIndex {
    /// Resolve a post code as written, then upper-cased. Codes without a
    /// canonical URL do not resolve.
    pub fn resolve_code(&self, code: &str) -> Option<ResolvedPost> {
        let (code, id) = self
            .code_to_id
            .get_key_value(code)
            .or_else(|| self.code_to_id.get_key_value(&code.to_uppercase()))?;
        let url = self.id_to_url.get(id)?;

        Some(ResolvedPost {
            id: id.clone(),
            code: code.clone(),
            url: url.clone(),
        })
    }

    /// Resolve a forum thread id to the archive entry it was published as.
    pub fn resolve_thread(&self, thread_id: &str) -> Option<ResolvedPost> {
        let code = self.thread_to_code.get(thread_id)?;
        self.resolve_code(code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DictionaryStatus {
    Approved,
    Pending,
    Rejected,
}

/// One spelling of one dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryIndexEntry {
    pub term: String,
    pub id: String,
    pub url: String,
    pub status: DictionaryStatus,
}

impl Term for DictionaryIndexEntry {
    fn term(&self) -> &str {
        &self.term
    }
}

pub type DictionaryTermIndex = Automaton<DictionaryIndexEntry>;

/// Group entries by case-folded term and build the automaton over them.
///
/// Keys are folded one character at a time, exactly as searched text is.
///
/// Entries of every status are indexed; the tagger decides which ones may
/// become references.
pub fn build_dictionary_index(
    entries: impl IntoIterator<Item = DictionaryIndexEntry>,
) -> DictionaryTermIndex {
    let mut by_term: BTreeMap<String, Vec<DictionaryIndexEntry>> = BTreeMap::new();
    for entry in entries {
        if entry.term.is_empty() {
            continue;
        }
        by_term
            .entry(entry.term.chars().map(fold_char).collect())
            .or_default()
            .push(entry);
    }
    Automaton::build(by_term)
}

/// An external Discord server people can be invited to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordServerEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "joinURL")]
    pub join_url: String,
}

/// The directory of known external servers, keyed by server id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerDirectory {
    servers: Vec<DiscordServerEntry>,
}

impl ServerDirectory {
    pub fn new(servers: Vec<DiscordServerEntry>) -> Self {
        let mut directory = ServerDirectory::default();
        for server in servers {
            directory.add_or_edit(&server.id, &server.name, &server.join_url);
        }
        directory
    }

    pub fn get(&self, id: &str) -> Option<&DiscordServerEntry> {
        self.servers.iter().find(|server| server.id == id)
    }

    pub fn add_or_edit(&mut self, id: &str, name: &str, join_url: &str) {
        match self.servers.iter_mut().find(|server| server.id == id) {
            Some(existing) => {
                existing.name = name.to_string();
                existing.join_url = join_url.to_string();
            }
            None => self.servers.push(DiscordServerEntry {
                id: id.to_string(),
                name: name.to_string(),
                join_url: join_url.to_string(),
            }),
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.servers.len();
        self.servers.retain(|server| server.id != id);
        self.servers.len() != before
    }

    pub fn servers(&self) -> &[DiscordServerEntry] {
        &self.servers
    }
}

/// Live metadata for a guild channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_archive_index, sample_dictionary_entries};

    #[test]
    fn test_resolve_code_falls_back_to_upper_case() {
        let index = sample_archive_index();
        let post = index.resolve_code("abc123").expect("code should resolve");
        assert_eq!(post.code, "ABC123");
        assert_eq!(post.id, "entry-abc");
        assert!(index.resolve_code("ZZZ999").is_none());
    }

    #[test]
    fn test_code_without_url_does_not_resolve() {
        let mut index = sample_archive_index();
        index.id_to_url.remove("entry-abc");
        assert!(index.resolve_code("ABC123").is_none());
    }

    #[test]
    fn test_resolve_thread() {
        let index = sample_archive_index();
        assert_eq!(index.resolve_thread("1001").map(|post| post.code), Some("ABC123".into()));
        assert!(index.resolve_thread("424242").is_none());
    }

    #[test]
    fn test_archive_index_json_keys() {
        let index: ArchiveIndex = serde_json::from_str(
            r#"{"codeToID":{"A001":"a"},"threadToCode":{"1":"A001"},"idToURL":{"a":"https://x/a"}}"#,
        )
        .unwrap();
        assert_eq!(index.resolve_thread("1").map(|post| post.url), Some("https://x/a".into()));
    }

    #[test]
    fn test_dictionary_index_keeps_all_statuses() {
        let index = build_dictionary_index(sample_dictionary_entries());
        assert!(index
            .outputs()
            .any(|entry| entry.status == DictionaryStatus::Pending));
    }

    #[test]
    fn test_terms_fold_like_searched_text() {
        let index = build_dictionary_index(vec![DictionaryIndexEntry {
            term: "ΟΔΟΣ".into(),
            id: "dict-odos".into(),
            url: "https://dict.example/dict-odos".into(),
            status: DictionaryStatus::Approved,
        }]);
        let found = index.find_matches("the ΟΔΟΣ here");
        assert_eq!(found.len(), 1, "a final sigma must not change the key");
        assert_eq!((found[0].start, found[0].end), (4, 12));
    }

    #[test]
    fn test_server_directory_edits() {
        let mut directory = ServerDirectory::default();
        directory.add_or_edit("1", "One", "https://discord.gg/one");
        directory.add_or_edit("1", "Uno", "https://discord.gg/uno");
        assert_eq!(directory.servers().len(), 1);
        assert_eq!(directory.get("1").map(|s| s.name.as_str()), Some("Uno"));
        assert!(directory.remove("1"));
        assert!(!directory.remove("1"));
    }
}
