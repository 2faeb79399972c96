//! Streamgate CLI - Command-line interface
//!
//! Runs the streaming server and prints shareable links.

mod commands;

use clap::Parser;

#[derive(Parser)]
#[command(name = "streamgate")]
#[command(about = "Byte-range HTTP streaming for remotely stored media")]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::handle_command(cli.command).await
}
