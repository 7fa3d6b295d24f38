use serde::{Deserialize, Serialize};

/// A Discord account as it was last classified against the guild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordAuthor {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "iconURL", default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Why the author is acknowledged on an entry, when they are.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A free-form author name with no resolvable account behind it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnknownAuthor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Author {
    #[serde(rename = "discord-inguild")]
    DiscordInGuild(DiscordAuthor),
    #[serde(rename = "discord-leftguild")]
    DiscordLeftGuild(DiscordAuthor),
    #[serde(rename = "discord-external")]
    DiscordExternal(DiscordAuthor),
    #[serde(rename = "discord-deleted")]
    DiscordDeleted(DiscordAuthor),
    #[serde(rename = "unknown")]
    Unknown(UnknownAuthor),
}

impl Author {
    /// A mentioned user that has not been classified yet.
    pub fn unresolved(id: &str) -> Author {
        Author::Unknown(UnknownAuthor {
            id: Some(id.to_string()),
            ..Default::default()
        })
    }

    fn discord(&self) -> Option<&DiscordAuthor> {
        match self {
            Author::DiscordInGuild(author)
            | Author::DiscordLeftGuild(author)
            | Author::DiscordExternal(author)
            | Author::DiscordDeleted(author) => Some(author),
            Author::Unknown(_) => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Author::Unknown(author) => author.id.as_deref(),
            _ => self.discord().map(|author| author.id.as_str()),
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Author::Unknown(author) => &author.username,
            _ => self.discord().map_or("", |author| &author.username),
        }
    }

    /// Display name, falling back to the username and then the id.
    pub fn display_name(&self) -> &str {
        let display = self.discord().and_then(|author| author.display_name.as_deref());
        [display, Some(self.username()), self.id()]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
            .unwrap_or("Unknown")
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Author::Unknown(author) => author.reason.as_deref(),
            _ => self.discord().and_then(|author| author.reason.as_deref()),
        }
    }

    /// Identity used when deduplicating mentions: the account id, or the
    /// name for authors without one.
    pub fn key(&self) -> String {
        match self.id() {
            Some(id) => id.to_string(),
            None => format!("name:{}", self.username()),
        }
    }
}
