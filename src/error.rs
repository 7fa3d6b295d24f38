//! Errors raised by tagging collaborators.

use thiserror::Error;

/// Failures surfaced by a [`GuildContext`](crate::guild::GuildContext) or by
/// the batch driver.
///
/// Index fetch failures abort the tagging call that needed them. Author and
/// channel lookup failures are only ever logged: the tagger keeps the
/// reference with its identity fields.
#[derive(Debug, Error)]
pub enum TaggingError {
    #[error("archive index unavailable: {0}")]
    ArchiveIndex(String),

    #[error("dictionary index unavailable: {0}")]
    DictionaryIndex(String),

    #[error("server directory unavailable: {0}")]
    ServerDirectory(String),

    #[error("user {0} could not be resolved")]
    UnknownUser(String),

    #[error("channel {0} could not be resolved")]
    UnknownChannel(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = TaggingError> = std::result::Result<T, E>;
