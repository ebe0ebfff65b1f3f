use clap::Parser;
use owo_colors::OwoColorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "driveseek_cli=info,driveseek_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Auth => commands::auth::run(&cli).await,
        Commands::Search {
            query,
            json,
            email_to,
        } => commands::search::run(&cli, query, *json, email_to.as_deref()).await,
        Commands::Ask { input } => commands::ask::run(&cli, input).await,
        Commands::Kb { action } => commands::kb::run(&cli, action).await,
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        process::exit(1);
    }
}
