use std::path::{Path, PathBuf};

use anyhow::anyhow;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Guild the snapshot is used for; empty keeps the snapshot's own id
    pub guild_id: String,
    /// Guild snapshot, relative to the root unless absolute
    pub snapshot_path: String,
    pub skip_terms: bool,
    pub log_level: String,
    pub render_target: RenderTarget,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum RenderTarget {
    Discord,
    Website,
}

impl RenderTarget {
    pub fn is_discord(self) -> bool {
        matches!(self, RenderTarget::Discord)
    }
}

impl Settings {
    pub fn new(root_dir: &Path) -> anyhow::Result<Settings> {
        let expanded = shellexpand::tilde("~/.config/reftagger/settings");
        let settings = Config::builder()
            .add_source(File::with_name(&expanded).required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/.reftagger",
                    root_dir
                        .to_str()
                        .ok_or(anyhow!("Can't convert root_dir to str"))?
                ))
                .required(false),
            )
            .add_source(Environment::with_prefix("REFTAGGER"))
            .set_default("guild_id", "")?
            .set_default("snapshot_path", "snapshot.json")?
            .set_default("skip_terms", false)?
            .set_default("log_level", "info")?
            .set_default("render_target", "Website")?
            .build()
            .map_err(|err| anyhow!("Build err: {err}"))?;

        let settings = settings.try_deserialize::<Settings>()?;

        anyhow::Ok(settings)
    }

    pub fn snapshot_path(&self, root_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(&self.snapshot_path);
        root_dir.join(expanded.as_ref())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            guild_id: "".to_string(),
            snapshot_path: "snapshot.json".to_string(),
            skip_terms: false,
            log_level: "info".to_string(),
            render_target: RenderTarget::Website,
        }
    }
}
