//! JtReader CLI - Command-line interface for inspecting JT files

pub mod commands;
pub mod progress;

use clap::Parser;
use commands::Commands;

#[derive(Parser)]
#[command(name = "jtreader")]
#[command(about = "JtReader: inspect JT scene graphs and tessellated geometry", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Run the JtReader CLI
pub fn run_cli() -> anyhow::Result<()> {
    // Logs go to stderr so `--json` output stays parseable
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    cli.command.execute()?;

    Ok(())
}
