use std::process::ExitCode;

use clap::Parser;
use reftagger::cli::{init_logging, run, Cli};
use reftagger::config::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let root = match &cli.root {
        Some(root) => root.clone(),
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(err) => {
                eprintln!("reftagger: cannot determine working directory: {err}");
                return ExitCode::FAILURE;
            }
        },
    };

    let settings = match Settings::new(&root) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("reftagger: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&settings.log_level);

    match run(cli, &root, &settings).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = ?err, "command failed");
            eprintln!("reftagger: {err:#}");
            ExitCode::FAILURE
        }
    }
}
