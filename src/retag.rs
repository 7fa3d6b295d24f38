//! Batch jobs over stored archive entries.
//!
//! Every `*.json` file below the root is one entry. Entries are processed one
//! at a time in path order, and a file is rewritten only when one of its
//! reference lists actually changed. Rewrites replace the reference lists in
//! place; every other key keeps its value and position.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::diff::has_references_changed;
use crate::guild::GuildContext;
use crate::markdown::SubmissionRecords;
use crate::references::{Author, Reference};
use crate::tagger::{
    refresh_mentions, tag_references, tag_references_in_acknowledgements,
    tag_references_in_submission_records,
};

/// The fields of a stored archive entry the batch jobs read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveEntryFile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<SubmissionRecords>,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub author_references: Vec<Reference>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetagSummary {
    pub scanned: usize,
    pub modified: usize,
    pub failed: usize,
}

/// What a batch does to each entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchJob {
    /// Tag the entry's text, records and acknowledgements again.
    Retag,
    /// Re-enrich stored user and channel mentions only.
    Refresh,
}

/// An entry file: its raw object, kept for the rewrite, and the typed view.
struct EntryDocument {
    raw: Map<String, Value>,
    entry: ArchiveEntryFile,
}

fn entry_paths(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e
                    .file_name()
                    .to_str()
                    .map(|s| s.starts_with('.'))
                    .unwrap_or(false)
        })
        .flatten()
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect()
}

fn read_entry_file(path: &Path) -> anyhow::Result<EntryDocument> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let raw: Map<String, Value> =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let entry = serde_json::from_value(Value::Object(raw.clone()))
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(EntryDocument { raw, entry })
}

fn write_entry_file(path: &Path, raw: &Map<String, Value>) -> anyhow::Result<()> {
    let output = serde_json::to_string_pretty(raw)?;
    fs::write(path, output + "\n").with_context(|| format!("writing {}", path.display()))
}

/// Compare a stored list with a fresh one. On change, the merged list replaces
/// `key` in `raw`, in place when the key already exists.
fn apply_references(
    raw: &mut Map<String, Value>,
    key: &str,
    stored: &[Reference],
    fresh: &[Reference],
    entry_id: &str,
) -> anyhow::Result<bool> {
    let diff = has_references_changed(Some(stored), fresh);
    if !diff.changed {
        return Ok(false);
    }

    debug!(
        entry = %entry_id,
        list = key,
        added = diff.added.len(),
        removed = diff.removed.len(),
        updated = diff.updated.len(),
        "references changed"
    );
    raw.insert(key.to_string(), serde_json::to_value(&diff.result)?);
    Ok(true)
}

/// Re-tag one entry file. Returns whether the file was rewritten.
pub async fn retag_entry<G: GuildContext>(path: &Path, guild: &G) -> anyhow::Result<bool> {
    let EntryDocument { mut raw, entry } = read_entry_file(path)?;
    let self_id = Some(entry.id.as_str());

    let fresh = match (&entry.records, &entry.text) {
        (Some(records), _) => {
            tag_references_in_submission_records(records, &entry.references, guild, self_id).await?
        }
        (None, Some(text)) => tag_references(text, &entry.references, guild, self_id, false).await?,
        (None, None) => Vec::new(),
    };
    let fresh_authors =
        tag_references_in_acknowledgements(&entry.authors, &entry.author_references, guild, self_id)
            .await?;

    let references_changed =
        apply_references(&mut raw, "references", &entry.references, &fresh, &entry.id)?;
    let authors_changed = apply_references(
        &mut raw,
        "author_references",
        &entry.author_references,
        &fresh_authors,
        &entry.id,
    )?;

    if !references_changed && !authors_changed {
        return Ok(false);
    }
    write_entry_file(path, &raw)?;
    Ok(true)
}

/// Refresh the stored mention details of one entry file. Returns whether the
/// file was rewritten.
pub async fn refresh_entry<G: GuildContext>(path: &Path, guild: &G) -> anyhow::Result<bool> {
    let EntryDocument { mut raw, entry } = read_entry_file(path)?;

    let fresh = refresh_mentions(&entry.references, guild).await;
    let fresh_authors = refresh_mentions(&entry.author_references, guild).await;

    let references_changed =
        apply_references(&mut raw, "references", &entry.references, &fresh, &entry.id)?;
    let authors_changed = apply_references(
        &mut raw,
        "author_references",
        &entry.author_references,
        &fresh_authors,
        &entry.id,
    )?;

    if !references_changed && !authors_changed {
        return Ok(false);
    }
    write_entry_file(path, &raw)?;
    Ok(true)
}

/// Run `job` over every entry under `root`.
///
/// A failing entry is logged and counted; the rest of the batch still runs.
pub async fn run_batch<G: GuildContext>(
    root: &Path,
    guild: &G,
    job: BatchJob,
) -> anyhow::Result<RetagSummary> {
    if !root.is_dir() {
        anyhow::bail!("{} is not a directory", root.display());
    }

    let mut summary = RetagSummary::default();
    for path in entry_paths(root) {
        summary.scanned += 1;
        let result = match job {
            BatchJob::Retag => retag_entry(&path, guild).await,
            BatchJob::Refresh => refresh_entry(&path, guild).await,
        };
        match result {
            Ok(true) => summary.modified += 1,
            Ok(false) => {}
            Err(err) => {
                error!(path = %path.display(), job = ?job, error = ?err, "failed to process entry");
                summary.failed += 1;
            }
        }
    }

    info!(
        job = ?job,
        scanned = summary.scanned,
        modified = summary.modified,
        failed = summary.failed,
        "batch finished"
    );
    Ok(summary)
}

pub async fn retag_directory<G: GuildContext>(root: &Path, guild: &G) -> anyhow::Result<RetagSummary> {
    run_batch(root, guild, BatchJob::Retag).await
}

pub async fn refresh_directory<G: GuildContext>(root: &Path, guild: &G) -> anyhow::Result<RetagSummary> {
    run_batch(root, guild, BatchJob::Refresh).await
}
