mod actions;
mod cli;
mod commands;
mod config;
mod error;
mod geometry;
mod gesture;
mod model_download;
mod pipeline;
mod runner;
mod types;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    match cli.command {
        Commands::Run { camera, dry_run } => {
            commands::apply_run_overrides(&mut config, camera, dry_run);
            commands::run(&config)
        }
        Commands::Cameras => commands::cameras(),
        Commands::Classify {
            images,
            annotate_dir,
        } => commands::classify(&config, &images, annotate_dir.as_deref()),
        Commands::Config { write } => commands::config(&config, write.as_deref()),
    }
}
