use anyhow::Result;
use clap::Parser;

use repo2cwl::cli::{Cli, Commands};
use repo2cwl::{commands, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging
    logging::init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Convert(args) => commands::convert::run(args).await,
        Commands::Inspect(args) => commands::inspect::run(args),
        Commands::Config(args) => commands::config::run(args.command),
        Commands::Doctor(args) => commands::doctor::run(args),
    }
}
