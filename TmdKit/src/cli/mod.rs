//! `TmdKit` CLI - Command-line interface for TMD model tools

pub mod commands;

use clap::Parser;
use commands::Commands;
use tracing::Level;

#[derive(Parser)]
#[command(name = "tmdkit")]
#[command(about = "TmdKit: PlayStation TMD model tools for LSD: Dream Emulator", long_about = None)]
#[command(version)]
struct Cli {
    /// Show decoder debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Run the `TmdKit` CLI
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    cli.command.execute()?;

    Ok(())
}
