//! reftagger: reference tagging for a Discord-backed archive.
//!
//! Free text written by archive contributors mentions other archived posts
//! (by code such as `ABC123` or by Discord thread link), dictionary terms,
//! other Discord servers, users and channels. This crate finds those
//! references, keeps stored reference lists current, and renders text with
//! the references turned into links for Discord or for the website.
//!
//! # Architecture
//!
//! - [`matcher`]: regex extraction, the dictionary automaton, boundary rules
//! - [`tagger`]: text → references, against a [`guild::GuildContext`]
//! - [`overlap`]: span resolution and merging of equal targets
//! - [`diff`]: change detection between stored and fresh reference lists
//! - [`render`]: text + references → linked text
//! - [`retag`]: batch re-tagging of stored entries
//!
//! ```ignore
//! use reftagger::guild::SnapshotGuild;
//! use reftagger::render::transform_output_with_references_for_website;
//! use reftagger::tagger::tag_references;
//!
//! let guild = SnapshotGuild::load(&snapshot_path)?;
//! let references = tag_references(text, &[], &guild, None, false).await?;
//! let html = transform_output_with_references_for_website(text, &references);
//! ```

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod guild;
pub mod index;
pub mod markdown;
pub mod matcher;
pub mod overlap;
pub mod references;
pub mod render;
pub mod retag;
pub mod tagger;

#[cfg(test)]
pub mod test_utils;
