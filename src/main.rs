mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, WebArgs};
use wizwam::config::Config;
use wizwam::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let verbose = matches!(&cli.command, Some(Commands::Download(args)) if args.verbose);
    init_tracing(verbose);

    let config = Config::load().map_err(|e| format!("Failed to load config: {e}"))?;

    match cli.command.unwrap_or(Commands::Web(WebArgs::default())) {
        Commands::Download(args) => commands::download(config, args).await?,
        Commands::Info(args) => commands::info(config, args).await?,
        Commands::Web(args) => commands::web(config, args).await?,
        Commands::Plugins => commands::plugins(config)?,
    }

    Ok(())
}
