//! CLI entry point for the refstyle tool.

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

mod app_config;
mod cli;
mod commands;

use app_config::load_config;
use cli::{Cli, Command};
use commands::{
    run_annotate_command, run_apply_command, run_config_show_command, run_format_command,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries the formatted references only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?cli, "CLI arguments parsed");

    let loaded_config = load_config(cli.config.as_deref(), cli.no_config)?;
    if loaded_config.loaded_from_file
        && let Some(path) = &loaded_config.path
    {
        info!(path = %path.display(), "Loaded configuration file");
    }
    let file_config = loaded_config.config.as_ref();

    match &cli.command {
        Command::Format(args) => run_format_command(args, file_config).await,
        Command::Annotate(args) => run_annotate_command(args, file_config),
        Command::Apply(args) => run_apply_command(args, file_config).await,
        Command::Config => run_config_show_command(&loaded_config),
    }
}
