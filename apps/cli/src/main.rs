//! grab CLI - fetch one URL, magnet link or torrent file
//!
//! Exits 0 on success, 1 when the transfer fails, 130 when interrupted.

mod commands;
mod config;
mod output;
mod progress;

use anyhow::Result;
use clap::Parser;
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// grab - fetch files over HTTP(S) or BitTorrent
#[derive(Parser)]
#[command(name = "grab")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// URL, magnet link, or path to a local .torrent file
    input: String,

    /// Directory fetched files are saved to
    #[arg(long, env = "GRAB_SAVE_DIR")]
    save_dir: Option<PathBuf>,

    /// JSON settings file
    #[arg(long, env = "GRAB_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "human")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let settings = config::resolve_settings(cli.config.as_deref(), cli.save_dir).await?;
    let core = grab_core::GrabCore::new(settings)?;

    commands::fetch(&core, &cli.input, cli.output).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", style("✗").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
