mod api;
mod chat;
mod commands;
mod config;
mod links;
mod quiz;

use clap::Parser;
use tracing::{debug, error};

use commands::Command;
use config::Config;

/// Terminal client for the StudyBuddy tutor backend
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Backend base URL (overrides STUDYBUDDY_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load env
    let _ = dotenv::dotenv();
    let mut config = Config::from_env()?;
    if let Some(url) = cli.api_url {
        config = config.with_api_url(url);
    }
    if !links::is_valid_url(&config.api_url) {
        anyhow::bail!("Invalid backend URL: {}", config.api_url);
    }

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_writer(std::io::stderr)
        .init();
    debug!(api_url = %config.api_url, timeout = ?config.timeout, "configuration loaded");

    if let Err(e) = commands::run(cli.command, &config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
