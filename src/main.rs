use anyhow::Context;
use clap::Parser;

use fmon::Settings;
use fmon::cli::commands::{index, init, watch};
use fmon::cli::{Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Settings::load().context("Failed to load configuration")?,
    };

    fmon::logging::init_with_config(&settings.logging);

    let command = async {
        match &cli.command {
            Commands::Watch {
                until_changed,
                paths,
            } => watch::run(&settings, paths, *until_changed).await,
            Commands::Index { index_files } => index::run(&settings, index_files).await,
            Commands::Config => init::run_config(&settings),
            Commands::Init { force } => init::run_init(*force),
        }
    };

    tokio::select! {
        result = command => result,
        _ = tokio::signal::ctrl_c() => {
            fmon::log_event!("main", "interrupted");
            Ok(())
        }
    }
}
