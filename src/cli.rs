//! The `reftagger` command line.
//!
//! Each command produces its output as a string; `main` prints it. Logs go to
//! stderr so the JSON a command prints can be piped.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use itertools::Itertools;
use tracing_subscriber::EnvFilter;

use crate::config::{RenderTarget, Settings};
use crate::diff::{has_references_changed, ReferenceDiff};
use crate::guild::SnapshotGuild;
use crate::references::Reference;
use crate::render::{render_server_links, transform_output_with_references, ServerLinks};
use crate::retag::{refresh_directory, retag_directory, RetagSummary};
use crate::tagger::tag_references;

#[derive(Parser, Debug)]
#[command(
    name = "reftagger",
    version,
    about = "Tag archive, dictionary and Discord references in text",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Project root holding `.reftagger` and the guild snapshot (default: cwd).
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the references found in a text file as JSON.
    Tag {
        file: PathBuf,
        /// Entry the text belongs to; references to it are dropped.
        #[arg(long, value_name = "ID")]
        self_id: Option<String>,
        /// Previously stored references for the same text (JSON).
        #[arg(long, value_name = "REFS.json")]
        previous: Option<PathBuf>,
        /// Do not tag dictionary terms.
        #[arg(long)]
        skip_terms: bool,
    },
    /// Print a text file with its references rendered as links.
    Render {
        file: PathBuf,
        #[arg(long, value_name = "REFS.json")]
        references: PathBuf,
        /// Render for Discord instead of the configured target.
        #[arg(long)]
        discord: bool,
    },
    /// Compare two stored reference lists. Exits with 1 when they differ.
    Diff { old: PathBuf, new: PathBuf },
    /// Re-tag every entry file under a directory.
    Retag { dir: PathBuf },
    /// Refresh stored user and channel details without re-tagging.
    Refresh { dir: PathBuf },
}

/// Install the stderr subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_references(path: &Path) -> anyhow::Result<Vec<Reference>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn load_guild(root: &Path, settings: &Settings) -> anyhow::Result<SnapshotGuild> {
    let path = settings.snapshot_path(root);
    let guild = SnapshotGuild::load(&path)
        .with_context(|| format!("loading guild snapshot {}", path.display()))?;
    match settings.guild_id.is_empty() {
        true => Ok(guild),
        false => Ok(guild.with_guild_id(settings.guild_id.clone())),
    }
}

/// Rendered text, followed by the join links of the servers it mentions when
/// rendering for the website.
pub fn render_text(text: &str, references: &[Reference], target: RenderTarget) -> String {
    let mut server_links = ServerLinks::new();
    let rendered = transform_output_with_references(
        text,
        references,
        target.is_discord(),
        &mut HashSet::new(),
        &mut server_links,
    );

    match target {
        RenderTarget::Website if !server_links.is_empty() => {
            format!("{rendered}\n\n{}", render_server_links(&server_links))
        }
        _ => rendered,
    }
}

pub fn format_diff(diff: &ReferenceDiff) -> String {
    let section = |sign: &str, references: &[Reference]| {
        references
            .iter()
            .map(|reference| format!("{sign} {}", reference.key()))
            .collect_vec()
    };

    [
        section("+", &diff.added),
        section("-", &diff.removed),
        section("~", &diff.updated),
    ]
    .concat()
    .join("\n")
}

pub async fn run(cli: Cli, root: &Path, settings: &Settings) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Tag {
            file,
            self_id,
            previous,
            skip_terms,
        } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let previous = match previous {
                Some(path) => read_references(&path)?,
                None => Vec::new(),
            };
            let guild = load_guild(root, settings)?;
            let references = tag_references(
                &text,
                &previous,
                &guild,
                self_id.as_deref(),
                skip_terms || settings.skip_terms,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&references)?);
        }
        Command::Render {
            file,
            references,
            discord,
        } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let references = read_references(&references)?;
            let target = match discord {
                true => RenderTarget::Discord,
                false => settings.render_target,
            };
            println!("{}", render_text(&text, &references, target));
        }
        Command::Diff { old, new } => {
            let old = read_references(&old)?;
            let new = read_references(&new)?;
            let diff = has_references_changed(Some(old.as_slice()), &new);
            if !diff.changed {
                return Ok(ExitCode::SUCCESS);
            }
            println!("{}", format_diff(&diff));
            return Ok(ExitCode::from(1));
        }
        Command::Retag { dir } => {
            let guild = load_guild(root, settings)?;
            return Ok(report_batch(retag_directory(&dir, &guild).await?));
        }
        Command::Refresh { dir } => {
            let guild = load_guild(root, settings)?;
            return Ok(report_batch(refresh_directory(&dir, &guild).await?));
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn report_batch(summary: RetagSummary) -> ExitCode {
    println!(
        "scanned {}, modified {}, failed {}",
        summary.scanned, summary.modified, summary.failed
    );
    match summary.failed {
        0 => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
